// SPDX-License-Identifier: GPL-3.0-or-later
use structopt::StructOpt;

use std::path::PathBuf;

#[derive(Debug, StructOpt)]
#[structopt(about = "Capture, classify and upload thermal images when triggered.")]
pub(crate) struct Args {
    /// Path to a configuration file.
    #[structopt(short, long, parse(from_os_str), default_value = "config.toml")]
    pub(crate) config_path: PathBuf,
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use structopt::StructOpt;

    use super::Args;

    #[test]
    fn default_path() {
        let args = Args::from_iter_safe(&["fire-watch"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
    }

    #[test]
    fn custom_path() {
        let args =
            Args::from_iter_safe(&["fire-watch", "--config-path", "/etc/fire-watch/config.toml"])
                .unwrap();
        assert_eq!(
            args.config_path,
            PathBuf::from("/etc/fire-watch/config.toml")
        );
        let args = Args::from_iter_safe(&["fire-watch", "-c", "other.toml"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("other.toml"));
    }
}
