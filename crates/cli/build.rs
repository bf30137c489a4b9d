use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("kindlekeep")
        .version("1.0.0")
        .author("kindlekeep Contributors")
        .about("Send unread Karakeep bookmarks to your Kindle")
        .arg(
            clap::arg!(-c --config <FILE> "Configuration file path")
                .value_name("FILE")
                .default_value("config.json")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .action(clap::ArgAction::SetTrue)
                .help("Show what would be done without sending or archiving anything"),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format, overrides the configured one")
                .value_name("FORMAT")
                .value_parser(["pdf", "epub", "html", "mobi"]),
        )
        .arg(clap::arg!(--compilation "Create a single document with all articles"))
        .arg(clap::arg!(--cleanup "Delete generated files after successful delivery"))
        .arg(
            clap::Arg::new("send-email")
                .long("send-email")
                .value_name("FILE")
                .help("Send the given file to the Kindle")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .subcommand(clap::Command::new("setup").about("Create the configuration file interactively"))
        .subcommand(
            clap::Command::new("clean")
                .about("Delete generated files from the output directory")
                .arg(
                    clap::Arg::new("keep-recent")
                        .long("keep-recent")
                        .action(clap::ArgAction::SetTrue)
                        .help("Keep files modified within the last hour"),
                ),
        )
        .subcommand(
            clap::Command::new("completions")
                .about("Generate a shell completion script")
                .arg(clap::arg!(<SHELL> "Target shell").value_parser(["bash", "zsh", "fish", "powershell", "elvish"])),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "kindlekeep", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "kindlekeep", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "kindlekeep", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "kindlekeep", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
