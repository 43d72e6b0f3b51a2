use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("webtree")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webtree")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about("Crawl a website into a bounded tree and save it as JSON")
                .arg(
                    arg!(<URL>)
                        .help("Starting URL to crawl")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"max-depth" <N>)
                        .required(false)
                        .help("Maximum depth to crawl")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"max-children" <N>)
                        .required(false)
                        .help("Maximum children per node")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Delay between sibling requests in seconds")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("1.0"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the tree")
                        .default_value("data/website_tree.json"),
                )
                .arg(
                    arg!(--"no-filter")
                        .required(false)
                        .help("Keep navigational and low-context links")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-allow-all")
                        .required(false)
                        .help("Only follow links into the top domains listed in --moz-csv")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"moz-csv" <PATH>)
                        .required(false)
                        .help("CSV file with a 'Root Domain' column")
                        .default_value("data/moz_websites.csv"),
                )
                .arg(
                    arg!(--"top-n" <N>)
                        .required(false)
                        .help("Number of top domains to read from --moz-csv")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"no-random-sampling")
                        .required(false)
                        .help("Take the first links on a page instead of a random sample")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"seed" <N>)
                        .required(false)
                        .help("Seed for link sampling")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                ),
        )
        .subcommand(
            command!("expand")
                .about("Grow a saved tree wider or deeper below one node")
                .arg(
                    arg!(<FILE>)
                        .help("Tree JSON file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"url" <URL>)
                        .required(false)
                        .help("URL of the node to expand"),
                )
                .arg(
                    arg!(--"width" <N>)
                        .required(false)
                        .help("Number of children to add to the node")
                        .value_parser(clap::value_parser!(usize))
                        .conflicts_with("depth"),
                )
                .arg(
                    arg!(--"depth" <N>)
                        .required(false)
                        .help("Number of levels to add below the node")
                        .value_parser(clap::value_parser!(usize))
                        .conflicts_with("width"),
                )
                .arg(
                    arg!(--"max-children" <N>)
                        .required(false)
                        .help("Maximum children per node for depth expansion")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Delay between requests in seconds")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("1.0"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the expanded tree (default: overwrite FILE)"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"list-nodes")
                        .required(false)
                        .help("List the nodes of the tree by depth and exit")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("show")
                .about("Print a saved tree")
                .arg(
                    arg!(<FILE>)
                        .help("Tree JSON file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-s --"style" <STYLE>)
                        .required(false)
                        .help("Rendering style")
                        .value_parser(["summary", "clustered", "depth", "stats"])
                        .default_value("summary"),
                )
                .arg(
                    arg!(--"max-depth" <N>)
                        .required(false)
                        .help("Hide nodes deeper than this")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"expandability")
                        .required(false)
                        .help("Show how much each node could still grow")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"relationships")
                        .required(false)
                        .help("Append the relationship distribution per depth")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("validate")
                .about("Check a saved tree against minimum depth and width")
                .arg(
                    arg!(<FILE>)
                        .help("Tree JSON file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"min-depth" <N>)
                        .required(false)
                        .help("Minimum tree depth")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"min-width" <N>)
                        .required(false)
                        .help("Minimum children at some non-leaf level")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                ),
        )
}
