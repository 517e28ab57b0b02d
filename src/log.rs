use std::io::Write;

use env_logger::Builder;

/// Initialize the global logger, the level is taken from `RUST_LOG`.
///
/// Calling it more than once is harmless, every call after the first
/// one is ignored.
pub fn init_log() {
    let mut builder = Builder::from_default_env();
    let _ = builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}:{}] [{:?}] {}",
                record.level(),
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                std::thread::current().id(),
                record.args()
            )
        })
        .is_test(cfg!(test))
        .try_init();
}
