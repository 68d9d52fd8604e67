//! Windows point query and main window lookup

use tracing::debug;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT};
use windows::Win32::System::Threading::GetCurrentProcessId;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::core::visibility::{WindowId, WindowProbe};

/// `WindowFromPoint` resolved to the owning top-level window
pub struct PointProbe;

impl WindowProbe for PointProbe {
    fn window_at(&self, x: i32, y: i32) -> Option<WindowId> {
        unsafe {
            let hit = WindowFromPoint(POINT { x, y });
            if hit.0.is_null() {
                return None;
            }
            // Child controls report themselves; compare against the root window
            let root = GetAncestor(hit, GA_ROOT);
            let hwnd = if root.0.is_null() { hit } else { root };
            Some(WindowId(hwnd.0 as isize))
        }
    }
}

/// First visible top-level window owned by this process
pub fn main_window_id() -> Option<WindowId> {
    unsafe {
        let mut windows: Vec<HWND> = Vec::new();
        let callback_data = &mut windows as *mut Vec<HWND>;

        unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
            let windows = &mut *(lparam.0 as *mut Vec<HWND>);
            windows.push(hwnd);
            BOOL::from(true)
        }

        let _ = EnumWindows(Some(enum_callback), LPARAM(callback_data as isize));

        let pid = GetCurrentProcessId();
        for hwnd in windows {
            let mut window_pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut window_pid));
            if window_pid == pid && IsWindowVisible(hwnd).as_bool() {
                debug!("Main window handle {:?}", hwnd);
                return Some(WindowId(hwnd.0 as isize));
            }
        }
    }
    None
}
