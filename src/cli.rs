use std::env;
use std::error::Error;
use std::io::Write;
use std::process::exit;

use clap::{Arg, ArgAction, ArgMatches, Command, crate_description, crate_version, value_parser};
use pretty_env_logger::env_logger::Builder;

use inireader::mail::MailSettings;
use inireader::{Document, Encoding, OrphanPolicy, ReaderOptions};

fn set_logger_level(b: &mut Builder) {
    if env::var("RUST_LOG").is_err() {
        b.filter_level(log::LevelFilter::Info);
    }
    b.init();
}

fn setup_logger() {
    match env::var("RUST_LOG_STYLE") {
        Ok(s) if s == "SYSTEMD" => {
            let builder = &mut pretty_env_logger::env_logger::builder();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    match record.level() {
                        log::Level::Error => 3,
                        log::Level::Warn => 4,
                        log::Level::Info => 6,
                        log::Level::Debug | log::Level::Trace => 7,
                    },
                    record.target(),
                    record.args()
                )
            });
            set_logger_level(builder);
        }
        _ => set_logger_level(&mut pretty_env_logger::formatted_builder()),
    }
}

pub(crate) fn main() {
    let cli = Command::new("inireader")
        .about(crate_description!())
        .arg(
            Arg::new("file")
                .required(true)
                .value_name("FILE")
                .help("Configuration file to read"),
        )
        .arg(
            Arg::new("encoding")
                .short('e')
                .long("encoding")
                .default_value("auto")
                .help("Text encoding: auto, or a charset label such as UTF-8, GBK or UTF-16LE"),
        )
        .arg(
            Arg::new("orphans")
                .long("orphans")
                .default_value("reject")
                .help("Properties before the first header: reject, discard, or a section title"),
        )
        .arg(
            Arg::new("get")
                .long("get")
                .num_args(2)
                .value_names(["SECTION", "KEY"])
                .help("Print a single value with its date placeholders rendered"),
        )
        .arg(
            Arg::new("mail")
                .action(ArgAction::SetTrue)
                .long("mail")
                .conflicts_with("get")
                .help("Print the mail settings as JSON"),
        )
        .arg(
            Arg::new("json")
                .action(ArgAction::SetTrue)
                .long("json")
                .help("Print the document as JSON"),
        )
        .arg(
            Arg::new("at")
                .long("at")
                .value_name("MILLIS")
                .value_parser(value_parser!(i64))
                .help("Timestamp for date placeholders, in milliseconds since the epoch"),
        )
        .version(crate_version!());

    let args = cli.get_matches();

    setup_logger();

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        exit(2);
    }
}

fn run(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let encoding = args
        .get_one::<String>("encoding")
        .map_or(Ok(Encoding::Auto), |s| s.parse::<Encoding>())?;
    let orphans = match args.get_one::<String>("orphans").map(String::as_str) {
        None | Some("reject") => OrphanPolicy::Reject,
        Some("discard") => OrphanPolicy::Discard,
        Some(title) => OrphanPolicy::Section(title.to_owned()),
    };
    let path = args
        .get_one::<String>("file")
        .ok_or("a configuration file is required")?;

    let reader = ReaderOptions::new()
        .encoding(encoding)
        .orphans(orphans)
        .open(path)?;
    tracing::info!(
        path = %path,
        sections = reader.document().len(),
        warnings = reader.document().warnings().len(),
        "Loaded configuration"
    );

    let now = args
        .get_one::<i64>("at")
        .copied()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    if let Some(values) = args.get_many::<String>("get") {
        let mut values = values.map(String::as_str);
        let (Some(section), Some(key)) = (values.next(), values.next()) else {
            return Err("--get expects a section and a key".into());
        };
        println!("{}", reader.get_string_with_date(section, key, now)?);
    } else if args.get_flag("mail") {
        let settings = MailSettings::from_reader(&reader, now)?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(reader.document())?);
    } else {
        print_document(reader.document());
    }

    Ok(())
}

fn print_document(document: &Document) {
    for section in document.sections() {
        println!("[{}]", section.title());

        for property in section.properties() {
            println!("{} = {}", property.key(), property.value());
        }

        println!();
    }
}
