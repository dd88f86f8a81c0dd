use std::path::PathBuf;

const APP_DIR: &str = "punchclock";

#[cfg(not(target_os = "windows"))]
pub fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").expect("Failed to find $HOME");
    PathBuf::from(home)
}

#[cfg(target_os = "windows")]
pub fn home_dir() -> PathBuf {
    let home = std::env::var("USERPROFILE").expect("Failed to find %userprofile%");
    PathBuf::from(home)
}

/// `$PUNCHCLOCK_CONFIG_DIR`, or the punchclock folder in the XDG config dir.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PUNCHCLOCK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let config_dir =
        std::env::var("XDG_CONFIG_HOME").map_or_else(|_| home_dir().join(".config"), PathBuf::from);
    config_dir.join(APP_DIR)
}

pub fn data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map_or_else(|_| home_dir().join(".local").join("share"), PathBuf::from);
    data_dir.join(APP_DIR)
}
