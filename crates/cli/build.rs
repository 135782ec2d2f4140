use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("distill")
        .about("Turn a web URL into a clean, readable article")
        .arg(clap::arg!(<URL> "URL to fetch and extract"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (html, json)")
                .default_value("html")
                .value_parser(["html", "json"]),
        )
        .arg(
            clap::arg!(--config_dir <DIR> "Site rule directory (repeatable)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--links <POLICY> "Link policy (preserve, footnotes, remove)")
                .default_value("preserve")
                .value_parser(["preserve", "footnotes", "remove"]),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests"))
        .arg(clap::arg!(--no_rewrite "Keep relative URLs in the content"))
        .arg(clap::arg!(--no_multipage "Do not follow next-page links"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "distill", &completions_dir)
        .unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "distill", &completions_dir)
        .unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "distill", &completions_dir)
        .unwrap();
}
