use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("qnasnap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Save homework-help pages as self-contained HTML")
        .arg(clap::arg!(<URL> "Question or textbook-solution URL"))
        .arg(
            clap::arg!(-c --cookie <FILE> "Cookie file: browser JSON export or raw header")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-s --save <FORMAT> "File name template"))
        .arg(
            clap::arg!(-o --"output-dir" <DIR> "Directory documents are written under")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--config <FILE> "Config file").value_parser(clap::value_parser!(std::path::PathBuf)))
        .arg(clap::arg!(--"user-agent" <UA> "User-Agent sent with every request"))
        .arg(
            clap::arg!(--template <FILE> "Main page template")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds"))
        .arg(clap::arg!(--"gateway-authorization" <TOKEN> "Basic credential for the question gateway"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .arg(clap::arg!(--"print-parts" "Print what was resolved after saving"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "qnasnap", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "qnasnap", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "qnasnap", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "qnasnap", &completions_dir).unwrap();
}
