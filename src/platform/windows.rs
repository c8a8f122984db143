//! Windows backend.
//!
//! The adapter's address override lives in its driver configuration key
//! under the network adapter class container. To find that key, the
//! connection name ("Wi-Fi") is mapped to the adapter's driver description
//! through `wmic`, then the container's subkeys are scanned for a matching
//! `DriverDesc`. The interface is disabled around the registry write so the
//! driver picks up the new value on re-enable.

use tracing::{debug, info, warn};

use super::{
    failure_detail, is_permission_denied, parse, read_failure, run_step, InterfaceHandle,
    NetworkBackend,
};
use crate::command::CommandExecutor;
use crate::domain::MacAddress;
use crate::error::{ApplyStep, MacError, MacResult};

/// Network adapter class container under `HKEY_LOCAL_MACHINE`.
pub const ADAPTER_CLASS_CONTAINER: &str =
    r"HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Class\{4d36e972-e325-11ce-bfc1-08002be10318}";

/// Upper bound on subkeys examined while resolving an adapter.
pub const MAX_ADAPTER_SUBKEYS: usize = 1000;

/// Registry value holding the overriding hardware address.
const NETWORK_ADDRESS_VALUE: &str = "NetworkAddress";

/// Backend that writes the address into the adapter's registry key.
pub struct WindowsBackend<E> {
    executor: E,
}

impl<E: CommandExecutor> WindowsBackend<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Driver description of the adapter whose connection name is `label`.
    fn adapter_description(&self, label: &str) -> MacResult<String> {
        if label.is_empty() || label.contains('\'') {
            return Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: "connection name cannot be used in a WMI filter".to_string(),
            });
        }

        let filter = format!("NetConnectionID='{}'", label);
        let output = self
            .executor
            .run("wmic", &["nic", "where", &filter, "get", "Name"])
            .map_err(|e| MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            let detail = failure_detail(&output);
            if is_permission_denied(&detail) {
                return Err(MacError::Permission {
                    step: ApplyStep::Resolve,
                    detail,
                });
            }
            return Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: format!("wmic failed: {}", detail),
            });
        }

        debug!("wmic output for '{}': {:?}", label, output.stdout);

        match parse::wmic_name_column(&output.stdout) {
            Ok(Some(description)) => Ok(description),
            Ok(None) => Err(MacError::InterfaceNotFound(label.to_string())),
            Err(reason) => Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason,
            }),
        }
    }

    /// Full path of the first adapter key whose `DriverDesc` equals `description`.
    fn find_adapter_key(&self, label: &str, description: &str) -> MacResult<String> {
        let listing = self
            .executor
            .run("reg", &["query", ADAPTER_CLASS_CONTAINER])
            .map_err(|e| MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: e.to_string(),
            })?;

        if !listing.success() {
            let detail = failure_detail(&listing);
            if is_permission_denied(&detail) {
                return Err(MacError::Permission {
                    step: ApplyStep::Resolve,
                    detail,
                });
            }
            return Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: format!("cannot enumerate adapter class: {}", detail),
            });
        }

        let subkeys = parse::registry_subkeys(&listing.stdout, ADAPTER_CLASS_CONTAINER);
        if subkeys.len() > MAX_ADAPTER_SUBKEYS {
            warn!(
                "Adapter class has {} subkeys, only the first {} are examined",
                subkeys.len(),
                MAX_ADAPTER_SUBKEYS
            );
        }

        for key in subkeys.iter().take(MAX_ADAPTER_SUBKEYS) {
            let output = match self.executor.run("reg", &["query", key, "/v", "DriverDesc"]) {
                Ok(output) => output,
                Err(e) => {
                    debug!("Skipping {}: {}", key, e);
                    continue;
                }
            };

            // Keys without a DriverDesc (or that we can't open) are skipped
            if !output.success() {
                continue;
            }
            let Some(driver_desc) = parse::driver_desc(&output.stdout) else {
                continue;
            };

            if driver_desc == description {
                debug!("Adapter '{}' is {}", description, key);
                return Ok(key.clone());
            }
        }

        Err(MacError::AmbiguousOrUnsupported {
            label: label.to_string(),
            reason: format!("no adapter key with DriverDesc '{}'", description),
        })
    }

    fn set_admin_state(&self, label: &str, step: ApplyStep, state: &str) -> MacResult<()> {
        let admin = format!("admin={}", state);
        run_step(
            &self.executor,
            label,
            step,
            "netsh",
            &["interface", "set", "interface", label, &admin],
        )?;
        Ok(())
    }
}

impl<E: CommandExecutor> NetworkBackend for WindowsBackend<E> {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn resolve(&self, label: &str) -> MacResult<InterfaceHandle> {
        let description = self.adapter_description(label)?;
        let key = self.find_adapter_key(label, &description)?;
        Ok(InterfaceHandle::RegistryKey(key))
    }

    fn read(&self, label: &str) -> MacResult<Option<MacAddress>> {
        let output = self
            .executor
            .run("getmac", &["/v", "/fo", "list"])
            .map_err(|e| MacError::Read {
                label: label.to_string(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            return Err(read_failure(label, &output));
        }

        // Substring match on the whole block: "Wi-Fi" also matches "Wi-Fi 2".
        // Matching blocks without an address (N/A) are passed over.
        let needle = label.to_lowercase();
        let mac = parse::adapter_blocks(&output.stdout)
            .iter()
            .filter(|block| block.to_lowercase().contains(&needle))
            .find_map(|block| parse::first_mac_token(block));

        debug!("Live address of {}: {:?}", label, mac);
        Ok(mac)
    }

    fn apply(&self, label: &str, mac: MacAddress) -> MacResult<()> {
        let handle = self.resolve(label)?;
        let InterfaceHandle::RegistryKey(key) = &handle else {
            return Err(MacError::AmbiguousOrUnsupported {
                label: label.to_string(),
                reason: format!("expected a registry key, got '{}'", handle),
            });
        };
        let digits = mac.to_hex_digits();

        self.set_admin_state(label, ApplyStep::Disable, "disable")?;
        run_step(
            &self.executor,
            label,
            ApplyStep::WriteAddress,
            "reg",
            &["add", key, "/v", NETWORK_ADDRESS_VALUE, "/d", &digits, "/f"],
        )?;
        self.set_admin_state(label, ApplyStep::Enable, "enable")?;

        info!("MAC address of {} changed to {}", label, mac);
        Ok(())
    }

    fn restore_link(&self, label: &str) -> MacResult<()> {
        self.set_admin_state(label, ApplyStep::Enable, "enable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::scripted::ScriptedExecutor;

    const WMIC_WIFI: &str = "Name                            \r\r\nIntel(R) Wi-Fi 6 AX201 160MHz   \r\r\n\r\r\n";

    fn class_listing() -> String {
        format!(
            "\r\n{c}\r\n    Class    REG_SZ    Net\r\n\r\n{c}\\0000\r\n{c}\\0001\r\n{c}\\0002\r\n{c}\\Properties\r\n",
            c = ADAPTER_CLASS_CONTAINER
        )
    }

    fn driver_desc(key: &str, desc: &str) -> String {
        format!(
            "\r\n{}\\{}\r\n    DriverDesc    REG_SZ    {}\r\n\r\n",
            ADAPTER_CLASS_CONTAINER, key, desc
        )
    }

    fn getmac_output() -> &'static str {
        "\r\nConnection Name:  Ethernet\r\nNetwork Adapter:  Realtek PCIe GbE Family Controller\r\nPhysical Address: 00-11-22-33-44-55\r\nTransport Name:   Media disconnected\r\n\r\nConnection Name:  Wi-Fi\r\nNetwork Adapter:  Intel(R) Wi-Fi 6 AX201 160MHz\r\nPhysical Address: 98-8D-46-FB-64-45\r\nTransport Name:   \\Device\\Tcpip_{ABC}\r\n"
    }

    /// Executor scripted for a successful resolve of "Wi-Fi" to subkey 0001.
    fn resolving_executor() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .ok(WMIC_WIFI)
            .ok(&class_listing())
            .ok(&driver_desc("0000", "WAN Miniport (IP)"))
            .ok(&driver_desc("0001", "Intel(R) Wi-Fi 6 AX201 160MHz"))
    }

    fn mac() -> MacAddress {
        MacAddress::normalize("02:AA:BB:CC:DD:EE").unwrap()
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn finds_matching_subkey() {
            let exec = resolving_executor();
            let backend = WindowsBackend::new(&exec);
            let handle = backend.resolve("Wi-Fi").unwrap();
            assert_eq!(
                handle,
                InterfaceHandle::RegistryKey(format!("{}\\0001", ADAPTER_CLASS_CONTAINER))
            );

            let calls = exec.calls();
            assert_eq!(calls[0], "wmic nic where NetConnectionID='Wi-Fi' get Name");
            assert_eq!(calls[1], format!("reg query {}", ADAPTER_CLASS_CONTAINER));
            assert!(calls[3].ends_with("\\0001 /v DriverDesc"));
            // stops at the first match
            assert_eq!(calls.len(), 4);
        }

        #[test]
        fn skips_keys_without_driver_desc() {
            let exec = ScriptedExecutor::new()
                .ok(WMIC_WIFI)
                .ok(&class_listing())
                .fail(1, "ERROR: The system was unable to find the specified registry key or value.")
                .ok(&format!("\r\n{}\\0001\r\n", ADAPTER_CLASS_CONTAINER))
                .ok(&driver_desc("0002", "Intel(R) Wi-Fi 6 AX201 160MHz"));
            let backend = WindowsBackend::new(&exec);
            let handle = backend.resolve("Wi-Fi").unwrap();
            assert_eq!(handle.to_string(), format!("{}\\0002", ADAPTER_CLASS_CONTAINER));
        }

        #[test]
        fn no_wmic_match_is_not_found() {
            let exec = ScriptedExecutor::new().ok("\r\n");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.resolve("Wi-Fi 9"),
                Err(MacError::InterfaceNotFound(ref l)) if l == "Wi-Fi 9"
            ));
        }

        #[test]
        fn malformed_wmic_output() {
            let exec = ScriptedExecutor::new().ok("Node,Name\r\nPC,Intel\r\n");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.resolve("Wi-Fi"),
                Err(MacError::AmbiguousOrUnsupported { .. })
            ));
        }

        #[test]
        fn wmic_missing() {
            let exec = ScriptedExecutor::new().missing("wmic");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.resolve("Wi-Fi"),
                Err(MacError::AmbiguousOrUnsupported { .. })
            ));
        }

        #[test]
        fn quote_in_label_rejected_without_running_anything() {
            let exec = ScriptedExecutor::new();
            let backend = WindowsBackend::new(&exec);
            assert!(backend.resolve("it's").is_err());
            assert!(exec.calls().is_empty());
        }

        #[test]
        fn enumeration_ends_without_match() {
            let exec = ScriptedExecutor::new()
                .ok(WMIC_WIFI)
                .ok(&class_listing())
                .ok(&driver_desc("0000", "WAN Miniport (IP)"))
                .ok(&driver_desc("0001", "WAN Miniport (IPv6)"))
                .ok(&driver_desc("0002", "Bluetooth Device"))
                .fail(1, "ERROR: Access is denied.");
            let backend = WindowsBackend::new(&exec);
            let err = backend.resolve("Wi-Fi").unwrap_err();
            assert!(matches!(err, MacError::AmbiguousOrUnsupported { .. }));
            // wmic + listing + four subkeys
            assert_eq!(exec.calls().len(), 6);
        }

        #[test]
        fn enumeration_is_capped() {
            let mut listing = format!("{}\r\n", ADAPTER_CLASS_CONTAINER);
            for i in 0..(MAX_ADAPTER_SUBKEYS + 5) {
                listing.push_str(&format!("{}\\{:04}\r\n", ADAPTER_CLASS_CONTAINER, i));
            }
            let exec = ScriptedExecutor::new().ok(WMIC_WIFI).ok(&listing);
            for _ in 0..(MAX_ADAPTER_SUBKEYS + 5) {
                exec.enqueue(Ok(crate::command::CommandOutput {
                    status: Some(0),
                    stdout: driver_desc("x", "Other"),
                    stderr: String::new(),
                }));
            }
            let backend = WindowsBackend::new(&exec);
            assert!(backend.resolve("Wi-Fi").is_err());
            assert_eq!(exec.calls().len(), 2 + MAX_ADAPTER_SUBKEYS);
        }

        #[test]
        fn listing_denied() {
            let exec = ScriptedExecutor::new()
                .ok(WMIC_WIFI)
                .fail(1, "ERROR: Access is denied.");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.resolve("Wi-Fi"),
                Err(MacError::Permission { step: ApplyStep::Resolve, .. })
            ));
        }
    }

    mod read_tests {
        use super::*;

        #[test]
        fn picks_block_by_label() {
            let exec = ScriptedExecutor::new().ok(getmac_output());
            let backend = WindowsBackend::new(&exec);
            let mac = backend.read("wi-fi").unwrap().unwrap();
            assert_eq!(mac.to_string(), "98:8D:46:FB:64:45");
            assert_eq!(exec.calls(), vec!["getmac /v /fo list"]);
        }

        #[test]
        fn first_matching_block_wins() {
            // "Ethernet" appears only in the first block
            let exec = ScriptedExecutor::new().ok(getmac_output());
            let backend = WindowsBackend::new(&exec);
            assert_eq!(
                backend.read("Ethernet").unwrap().unwrap().to_string(),
                "00:11:22:33:44:55"
            );
        }

        #[test]
        fn skips_matching_block_without_address() {
            let exec = ScriptedExecutor::new().ok(
                "\r\nConnection Name:  Wi-Fi Direct\r\nNetwork Adapter:  Microsoft Wi-Fi Direct Virtual Adapter\r\nPhysical Address: N/A\r\nTransport Name:   Hardware not present\r\n\r\nConnection Name:  Wi-Fi\r\nNetwork Adapter:  Intel(R) Wi-Fi 6 AX201 160MHz\r\nPhysical Address: 98-8D-46-FB-64-45\r\nTransport Name:   \\Device\\Tcpip_{ABC}\r\n",
            );
            let backend = WindowsBackend::new(&exec);
            assert_eq!(
                backend.read("Wi-Fi").unwrap().map(|m| m.to_string()),
                Some("98:8D:46:FB:64:45".to_string())
            );
        }

        #[test]
        fn unknown_label_is_none() {
            let exec = ScriptedExecutor::new().ok(getmac_output());
            let backend = WindowsBackend::new(&exec);
            assert_eq!(backend.read("Bluetooth").unwrap(), None);
        }

        #[test]
        fn getmac_missing_is_read_error() {
            let exec = ScriptedExecutor::new().missing("getmac");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(backend.read("Wi-Fi"), Err(MacError::Read { .. })));
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn full_sequence() {
            let exec = resolving_executor();
            let backend = WindowsBackend::new(&exec);
            backend.apply("Wi-Fi", mac()).unwrap();

            let calls = exec.calls();
            assert_eq!(calls.len(), 7);
            assert_eq!(calls[4], "netsh interface set interface Wi-Fi admin=disable");
            assert_eq!(
                calls[5],
                format!(
                    "reg add {}\\0001 /v NetworkAddress /d 02AABBCCDDEE /f",
                    ADAPTER_CLASS_CONTAINER
                )
            );
            assert_eq!(calls[6], "netsh interface set interface Wi-Fi admin=enable");
        }

        #[test]
        fn registry_write_failure_leaves_interface_disabled() {
            let exec = resolving_executor()
                .ok("")
                .fail(1, "ERROR: Invalid syntax.");
            let backend = WindowsBackend::new(&exec);
            let err = backend.apply("Wi-Fi", mac()).unwrap_err();
            assert_eq!(err.failed_step(), Some(ApplyStep::WriteAddress));
            // no enable after the failed write
            assert_eq!(exec.calls().len(), 6);
        }

        #[test]
        fn disable_failure_is_reported_with_step() {
            let exec = resolving_executor().fail(1, "No more data is available.");
            let backend = WindowsBackend::new(&exec);
            match backend.apply("Wi-Fi", mac()).unwrap_err() {
                MacError::Apply { step, command, .. } => {
                    assert_eq!(step, ApplyStep::Disable);
                    assert!(command.starts_with("netsh interface set interface"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn resolve_failure_runs_nothing_else() {
            let exec = ScriptedExecutor::new().ok("Name\r\n");
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.apply("Wi-Fi", mac()),
                Err(MacError::InterfaceNotFound(_))
            ));
            assert_eq!(exec.calls().len(), 1);
        }

        #[test]
        fn not_elevated() {
            let exec = resolving_executor().push(Ok(crate::command::CommandOutput {
                status: Some(1),
                stdout: "The requested operation requires elevation (Run as administrator).\r\n".into(),
                stderr: String::new(),
            }));
            let backend = WindowsBackend::new(&exec);
            assert!(matches!(
                backend.apply("Wi-Fi", mac()),
                Err(MacError::Permission { step: ApplyStep::Disable, .. })
            ));
        }
    }
}
