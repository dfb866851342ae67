#[cfg(test)]
mod impl_tty_test {
    use crate::device_link::impl_tty::{find_device, DeviceLinkTty, DeviceLinkTtyConfig};
    use crate::device_link::interface::{DeviceLink, LinkError};
    use crate::library::logger::impl_fake::LoggerFake;
    use crate::library::logger::interface::LogLevel;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    const PREFIX: &str = "usb-ARM_BBC_micro:bit";

    fn prefixes() -> Vec<String> {
        vec![PREFIX.to_string(), "usb-Arm_BBC_micro:bit".to_string()]
    }

    fn link(dir: &Path, logger: Arc<LoggerFake>) -> DeviceLinkTty {
        DeviceLinkTty::new(
            DeviceLinkTtyConfig {
                device_dir: dir.to_path_buf(),
                name_prefixes: prefixes(),
                baud_rate: 115_200,
            },
            logger,
        )
    }

    #[test]
    fn test_find_device_picks_first_match_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("usb-Other_Keyboard-if00"), b"").unwrap();
        fs::write(dir.path().join(format!("{}_B-if01", PREFIX)), b"").unwrap();
        fs::write(dir.path().join(format!("{}_A-if01", PREFIX)), b"").unwrap();

        let found = find_device(dir.path(), &prefixes()).unwrap();

        assert_eq!(found, dir.path().join(format!("{}_A-if01", PREFIX)));
    }

    #[test]
    fn test_find_device_accepts_any_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("usb-Arm_BBC_micro:bit_C-if01"), b"").unwrap();

        let found = find_device(dir.path(), &prefixes()).unwrap();

        assert_eq!(found, dir.path().join("usb-Arm_BBC_micro:bit_C-if01"));
    }

    #[test]
    fn test_connect_without_matching_device_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("usb-Other_Keyboard-if00"), b"").unwrap();
        let link = link(dir.path(), Arc::new(LoggerFake::new()));

        assert!(matches!(link.connect(), Err(LinkError::Unavailable(_))));
        assert!(!link.is_connected());
    }

    #[test]
    fn test_connect_with_missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let link = link(&dir.path().join("missing"), Arc::new(LoggerFake::new()));

        assert!(matches!(link.connect(), Err(LinkError::Unavailable(_))));
    }

    #[test]
    fn test_connect_to_matching_entry_that_is_not_a_serial_port_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{}_A-if01", PREFIX));
        fs::write(&path, b"").unwrap();
        let logger = Arc::new(LoggerFake::new());
        let link = link(dir.path(), logger.clone());

        let result = link.connect();

        assert!(matches!(
            result,
            Err(LinkError::Unavailable(ref message)) if message.contains("cannot open")
        ));
        assert!(!link.is_connected());
        assert!(!logger.contains(LogLevel::Info, "Opened"));
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_write_before_connect_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let link = link(dir.path(), Arc::new(LoggerFake::new()));

        assert_eq!(link.write(b"A#1\n"), Ok(false));
    }

    #[test]
    fn test_disconnect_without_connection_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let link = link(dir.path(), Arc::new(LoggerFake::new()));

        assert_eq!(link.disconnect(), Ok(()));
        assert!(!link.is_connected());
        assert_eq!(link.write(b"A#1\n"), Ok(false));
    }
}
