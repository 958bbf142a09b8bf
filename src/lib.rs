pub mod api;
pub mod core;

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("alarmcam_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // already-initialized is fine, e.g. when tests share a process
        let _ = env_logger::try_init();
    }
}
