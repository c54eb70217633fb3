use clap::{arg, crate_version, Command};
use log::{debug, trace, warn};
use ppcompress::{compress, decompress};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help =
"Examples:
---------
Compress:      `ppcompress compress -l 6 -i my_file -o my_file.pp`
Expand:        `ppcompress expand -i my_file.pp -o my_file`";

    let mut main_cmd = Command::new("ppcompress")
        .about("Compress and expand PP containers")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-l --level <LEVEL> "compression level, 1 (fastest) to 9 (smallest)")
            .required(false)
            .default_value("6"))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("compress a file into a PP container"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a PP container back to its original bytes"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let level: u8 = cmd.get_one::<String>("level").expect(RCH).parse()?;
        debug!("compressing {} at level {}", path_in, level);
        let dat = std::fs::read(path_in)?;
        let mut log_progress = |stage: &str, pct: u8, msg: &str| {
            trace!("[{pct:3}%] {stage}: {msg}");
        };
        let packed = compress(&dat, level, Some(&mut log_progress)).map_err(|e| {
            warn!("compression failed: {e}");
            e
        })?;
        std::fs::write(path_out, packed)?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        debug!("expanding {}", path_in);
        let dat = std::fs::read(path_in)?;
        let mut log_progress = |stage: &str, pct: u8, msg: &str| {
            trace!("[{pct:3}%] {stage}: {msg}");
        };
        let expanded = decompress(&dat, Some(&mut log_progress)).map_err(|e| {
            warn!("decompression failed: {e}");
            e
        })?;
        std::fs::write(path_out, expanded)?;
    }

    Ok(())
}
