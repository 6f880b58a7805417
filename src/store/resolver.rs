//! Window identity lookups used by the zone store.

use super::types::WindowHandle;

/// Answers questions about native windows.
///
/// Called by the store outside its data lock, except `is_window`, which is
/// asked about previously recorded handles while the lock is held and so must
/// not call back into the store.
pub trait WindowResolver: Send + Sync {
    /// Full path of the executable that owns `window`.
    fn process_path(&self, window: WindowHandle) -> Option<String>;

    fn process_id(&self, window: WindowHandle) -> Option<u32>;

    /// The handle still names a live window.
    fn is_window(&self, window: WindowHandle) -> bool;
}

#[cfg(windows)]
pub use win32::Win32Resolver;

#[cfg(windows)]
mod win32 {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, HWND};
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetWindowThreadProcessId, IsWindow};

    use super::{WindowHandle, WindowResolver};

    /// Resolver backed by the Win32 window and process APIs.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Win32Resolver;

    fn to_hwnd(window: WindowHandle) -> HWND {
        HWND(window as *mut _)
    }

    impl WindowResolver for Win32Resolver {
        fn process_path(&self, window: WindowHandle) -> Option<String> {
            let pid = self.process_id(window)?;

            unsafe {
                let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;

                let mut buffer = [0u16; 1024];
                let mut len = buffer.len() as u32;
                let result = QueryFullProcessImageNameW(
                    process,
                    PROCESS_NAME_WIN32,
                    PWSTR(buffer.as_mut_ptr()),
                    &mut len,
                );
                let _ = CloseHandle(process);

                if let Err(e) = result {
                    log::debug!("[STORE] No image name for pid {}: {}", pid, e);
                    return None;
                }
                Some(String::from_utf16_lossy(&buffer[..len as usize]))
            }
        }

        fn process_id(&self, window: WindowHandle) -> Option<u32> {
            let mut pid = 0u32;
            unsafe { GetWindowThreadProcessId(to_hwnd(window), Some(&mut pid)) };
            (pid != 0).then_some(pid)
        }

        fn is_window(&self, window: WindowHandle) -> bool {
            unsafe { IsWindow(to_hwnd(window)).as_bool() }
        }
    }
}
