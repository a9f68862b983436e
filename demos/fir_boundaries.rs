use notam_parser::fir::FirBoundaryTable;

fn main() {
    for polygon in FirBoundaryTable::embedded().iter() {
        println!("{polygon}");
    }
}
