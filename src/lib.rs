// for logging (debug mostly, switched at compile time in cargo.toml)

use lazy_static::lazy_static;

pub mod dataset;
pub mod distmatrix;
pub mod hubparams;
pub mod knn;
pub mod metric;
pub mod prelude;
pub mod tools;

lazy_static! {
    static ref LOG: u64 = init_log();
}

// install a logger facility
fn init_log() -> u64 {
    let _res = env_logger::try_init();
    log::info!("\n ************** initializing logger *****************\n");
    1
}

/// forces logger initialization, useful from library users not installing their own logger
pub fn ensure_log() {
    lazy_static::initialize(&LOG);
}

#[cfg(test)]
mod tests {
    #[test]
    // initialize once log system for tests.
    fn init_log() {
        let _res = env_logger::try_init();
    }
} // end of tests
