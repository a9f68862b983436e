use std::{env::args_os, fs, io, path::Path};

use notam_parser::{config::Config, pipeline::NotamPipeline};

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let path = args_os()
        .nth(1)
        .expect("missing argument: path to bulletin text");
    let config = match args_os().nth(2) {
        Some(config_path) => Config::from_file(Path::new(&config_path)).unwrap(),
        None => Config::default(),
    };
    let contents = fs::read(&path).unwrap();

    let pipeline = NotamPipeline::new(config).unwrap();
    match pipeline.parse_bulletin_bytes(&contents) {
        Ok(records) => println!("{}", serde_json::to_string(&records).unwrap()),
        Err(e) => eprintln!("{e}"),
    }
}
