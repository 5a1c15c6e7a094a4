use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("excerpta")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract structured articles from HTML using per-domain selector configs")
        .arg(clap::arg!(<INPUT> "Local HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-c --config <FILE> "Domain config file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--config_dir <DIR> "Directory searched for <domain>.json configs")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--url <URL> "Page URL; resolves relative links and selects the domain config"))
        .arg(clap::arg!(--domain <DOMAIN> "Domain used for config lookup when no URL is given"))
        .arg(
            clap::arg!(--preset <NAME> "Use a built-in config instead of a lookup")
                .value_name("NAME")
                .value_parser(["generic", "wordpress"]),
        )
        .arg(clap::arg!(--strict "Fail when lookup finds no config instead of using the generic preset"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format")
                .value_name("FORMAT")
                .default_value("markdown")
                .value_parser(["markdown", "html", "text", "json", "fields", "meta"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--frontmatter "Include TOML frontmatter (Markdown) or a title header (text)"))
        .arg(clap::arg!(--references "Include a reference table with all links (Markdown/JSON only)"))
        .arg(clap::arg!(--no_images "Strip images from output"))
        .arg(clap::arg!(--pretty "Pretty print JSON output"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "excerpta", &completions_dir).unwrap();
    }

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
