// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_REQUIRE: &str = "license,url,description,version,origin-hostname,provenance,menu-path";

/// Common argument: refine flags to request
fn require_arg() -> Arg {
    Arg::new("require")
        .long("require")
        .value_name("FLAGS")
        .default_value(DEFAULT_REQUIRE)
        .help("Comma separated refine flags")
}

fn build_cli() -> Command {
    Command::new("appcenter")
        .version(env!("CARGO_PKG_VERSION"))
        .author("AppCenter Contributors")
        .about("Query apps through the software center plugin engine")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file (default: ~/.config/appcenter/config.toml)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .subcommand(Command::new("plugins").about("Show plugins in run order and why disabled ones are off"))
        .subcommand(
            Command::new("search")
                .about("Search apps matching all terms")
                .arg(Arg::new("terms").required(true).num_args(1..).help("Search terms"))
                .arg(require_arg()),
        )
        .subcommand(
            Command::new("refine")
                .about("Refine apps by id and print the result")
                .arg(Arg::new("ids").required(true).num_args(1..).help("App ids"))
                .arg(require_arg()),
        )
        .subcommand(Command::new("updates").about("List pending updates").arg(require_arg()))
        .subcommand(Command::new("featured").about("List featured apps").arg(require_arg()))
        .subcommand(Command::new("categories").about("Show the category tree"))
        .subcommand(
            Command::new("file-to-app")
                .about("Describe a local package file")
                .arg(Arg::new("path").required(true).help("Package file path"))
                .arg(require_arg()),
        )
        .subcommand(
            Command::new("refresh")
                .about("Refresh plugin metadata")
                .arg(
                    Arg::new("cache_age")
                        .long("cache-age")
                        .value_name("SECS")
                        .default_value("0")
                        .help("Refresh data older than this many seconds"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("appcenter.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
