mod hierarchy;
mod policies;

/// Routes library warnings through the test harness when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
