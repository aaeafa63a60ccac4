use std::fs;
use std::path::Path;

/// Level reported when the host exposes no battery.
pub const DEFAULT_BATTERY_LEVEL: u8 = 100;

/// Battery level for the Battery Service, fixed for the lifetime of the
/// service: the configured override, else the host battery, else 100%.
pub fn battery_level(configured: Option<u8>) -> u8 {
    if let Some(level) = configured {
        return level.min(100);
    }
    match host_battery_percent() {
        Some(level) => {
            tracing::debug!(%level, "Host battery level");
            level
        }
        None => DEFAULT_BATTERY_LEVEL,
    }
}

fn host_battery_percent() -> Option<u8> {
    #[cfg(target_os = "linux")]
    {
        return sysfs_battery_percent(Path::new("/sys/class/power_supply"));
    }

    #[allow(unreachable_code)]
    None
}

fn parse_capacity(s: &str) -> Option<u8> {
    s.trim().parse::<u8>().ok().map(|v| v.min(100))
}

/// Scans a `power_supply` class directory for the first battery capacity.
fn sysfs_battery_percent(root: &Path) -> Option<u8> {
    let entries = fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let p = entry.path();
        let ty = fs::read_to_string(p.join("type")).ok();
        match ty.as_deref().map(str::trim) {
            Some("Battery") => {}
            Some(_) => continue,
            None => {
                let named_bat = p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("BAT"));
                if !named_bat {
                    continue;
                }
            }
        }
        if let Some(v) = fs::read_to_string(p.join("capacity"))
            .ok()
            .as_deref()
            .and_then(parse_capacity)
        {
            return Some(v);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_clamped() {
        assert_eq!(battery_level(Some(42)), 42);
        assert_eq!(battery_level(Some(250)), 100);
    }

    #[test]
    fn capacity_parsing() {
        assert_eq!(parse_capacity("87\n"), Some(87));
        assert_eq!(parse_capacity("120"), Some(100));
        assert_eq!(parse_capacity("n/a"), None);
    }

    #[test]
    fn sysfs_scan_skips_mains() {
        let root = std::env::temp_dir().join(format!("lekeyboard-ps-{}", std::process::id()));
        let ac = root.join("AC");
        let bat = root.join("BAT0");
        fs::create_dir_all(&ac).unwrap();
        fs::create_dir_all(&bat).unwrap();
        fs::write(ac.join("type"), "Mains\n").unwrap();
        fs::write(ac.join("capacity"), "5\n").unwrap();
        fs::write(bat.join("type"), "Battery\n").unwrap();
        fs::write(bat.join("capacity"), "64\n").unwrap();
        assert_eq!(sysfs_battery_percent(&root), Some(64));
        fs::remove_dir_all(&root).unwrap();
    }
}
