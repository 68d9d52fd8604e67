//! UDP output: six little-endian f64 per datagram

use std::net::UdpSocket;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::core::module::{ConfigDialog, Pose, Protocol, ProtocolModule};
use crate::core::ModuleError;

pub const POSE_DATAGRAM_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct UdpOptions {
    pub host: String,
    pub port: u16,
}

impl Default for UdpOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4242,
        }
    }
}

impl UdpOptions {
    pub fn target(&self) -> String {
        format!("{}:{}", self.host.trim(), self.port)
    }
}

/// x, y, z, yaw, pitch, roll as consecutive little-endian f64
pub fn encode_pose(pose: &Pose) -> [u8; POSE_DATAGRAM_LEN] {
    let mut buf = [0u8; POSE_DATAGRAM_LEN];
    for (chunk, value) in buf.chunks_exact_mut(8).zip(pose) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    buf
}

#[derive(Default)]
pub struct UdpProtocol {
    options: Arc<Mutex<UdpOptions>>,
}

impl UdpProtocol {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProtocolModule for UdpProtocol {
    fn create_dialog(&self) -> Result<Box<dyn ConfigDialog>, ModuleError> {
        let options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Box::new(UdpDialog {
            options: Arc::clone(&self.options),
            port_text: options.port.to_string(),
        }))
    }

    fn create_runtime_instance(&self) -> Result<Box<dyn Protocol>, ModuleError> {
        let options = self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(Box::new(UdpRuntime {
            options,
            socket: None,
            send_errors: 0,
        }))
    }
}

struct UdpRuntime {
    options: UdpOptions,
    socket: Option<UdpSocket>,
    send_errors: u64,
}

impl Protocol for UdpRuntime {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let target = self.options.target();
        socket
            .connect(&target)
            .map_err(|e| ModuleError::new(format!("cannot reach {}: {}", target, e)))?;
        info!("UDP output sending to {}", target);
        self.socket = Some(socket);
        Ok(())
    }

    fn pose(&mut self, pose: &Pose) {
        let Some(socket) = &self.socket else {
            return;
        };
        if let Err(e) = socket.send(&encode_pose(pose)) {
            // Nobody listening is normal; log once then stay quiet
            if self.send_errors == 0 {
                warn!("UDP send failed: {}", e);
            }
            self.send_errors += 1;
        }
    }
}

impl Drop for UdpRuntime {
    fn drop(&mut self) {
        if self.send_errors > 0 {
            debug!("UDP output closed after {} failed sends", self.send_errors);
        }
    }
}

struct UdpDialog {
    options: Arc<Mutex<UdpOptions>>,
    port_text: String,
}

impl ConfigDialog for UdpDialog {
    fn title(&self) -> String {
        "UDP output".to_string()
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let mut options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        egui::Grid::new("udp_options").num_columns(2).show(ui, |ui| {
            ui.label("Host");
            ui.text_edit_singleline(&mut options.host);
            ui.end_row();

            ui.label("Port");
            if ui.text_edit_singleline(&mut self.port_text).changed() {
                if let Ok(port) = self.port_text.trim().parse::<u16>() {
                    options.port = port;
                }
            }
            ui.end_row();
        });
        ui.label(
            egui::RichText::new("Applies the next time tracking starts")
                .small()
                .weak(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pose_layout() {
        let buf = encode_pose(&[1.0, 2.0, 3.0, -4.5, 0.0, 90.0]);
        assert_eq!(&buf[0..8], &1.0f64.to_le_bytes());
        assert_eq!(&buf[24..32], &(-4.5f64).to_le_bytes());
        assert_eq!(&buf[40..48], &90.0f64.to_le_bytes());
    }

    #[test]
    fn test_default_target() {
        assert_eq!(UdpOptions::default().target(), "127.0.0.1:4242");
    }

    #[test]
    fn test_pose_before_initialize_is_dropped() {
        let module = UdpProtocol::new();
        let mut runtime = module.create_runtime_instance().unwrap();
        runtime.pose(&[0.0; 6]);
        assert!(runtime.game_name().is_none());
    }
}
