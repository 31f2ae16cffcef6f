#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported platform")]
    UnsupportedPlatform,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("control failed: {0}")]
    Control(String),
}

/// Whether the current process token is elevated.
#[cfg(target_os = "windows")]
pub fn is_elevated() -> Result<bool, PlatformError> {
    use windows_sys::Win32::Foundation::{CloseHandle, GetLastError};
    use windows_sys::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    let mut token = std::ptr::null_mut();
    let opened = unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) };
    if opened == 0 {
        let error = unsafe { GetLastError() };
        return Err(PlatformError::Query(format!(
            "OpenProcessToken failed with error {error}"
        )));
    }

    let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
    let mut returned = 0_u32;
    let ok = unsafe {
        GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut TOKEN_ELEVATION as *mut core::ffi::c_void,
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut returned,
        )
    };
    let error = unsafe { GetLastError() };
    unsafe {
        CloseHandle(token);
    }

    if ok == 0 {
        return Err(PlatformError::Query(format!(
            "GetTokenInformation failed with error {error}"
        )));
    }
    Ok(elevation.TokenIsElevated != 0)
}

#[cfg(not(target_os = "windows"))]
pub fn is_elevated() -> Result<bool, PlatformError> {
    Err(PlatformError::UnsupportedPlatform)
}

#[cfg(target_os = "windows")]
pub(crate) fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}
