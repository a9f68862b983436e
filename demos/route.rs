use std::{env::args, fs, io};

use notam_parser::{config::Config, pipeline::NotamPipeline};

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let route = args()
        .nth(1)
        .expect("missing argument: route, e.g. RKSI..EGOBA Y697 LANAT..N44E160..KSEA");
    let pipeline = NotamPipeline::new(Config::default()).unwrap();

    match args().nth(2) {
        Some(bulletin_path) => {
            let contents = fs::read(bulletin_path).unwrap();
            let records = pipeline.parse_bulletin_bytes(&contents).unwrap();
            let analysis = pipeline.filter_for_route(&route, &records);
            eprintln!("{analysis}");
            println!("{}", serde_json::to_string(&analysis).unwrap());
        }
        None => println!(
            "{}",
            serde_json::to_string(&pipeline.analyze_route(&route)).unwrap()
        ),
    }
}
