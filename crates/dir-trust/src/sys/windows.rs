//! Windows implementation: security descriptors and access-control lists.

use std::{
    ffi::OsString,
    io,
    iter,
    os::windows::{
        ffi::{OsStrExt, OsStringExt},
        fs::{MetadataExt, OpenOptionsExt},
        io::AsRawHandle,
    },
    path::{Path, PathBuf},
    ptr,
};

use winapi::{
    ctypes::c_void,
    shared::{
        minwindef::{DWORD, FALSE, MAX_PATH},
        sddl::ConvertSidToStringSidW,
        winerror::ERROR_SUCCESS,
    },
    um::{
        accctrl::SE_FILE_OBJECT,
        aclapi::GetNamedSecurityInfoW,
        fileapi::{GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION},
        handleapi::CloseHandle,
        processthreadsapi::{GetCurrentProcess, OpenProcessToken},
        securitybaseapi::{GetAce, GetSecurityDescriptorControl, GetTokenInformation, IsValidSid},
        sysinfoapi::GetWindowsDirectoryW,
        winbase::{LocalFree, FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT},
        winnt::{
            TokenUser, ACCESS_ALLOWED_ACE, ACCESS_ALLOWED_ACE_TYPE, ACCESS_DENIED_ACE_TYPE,
            ACE_HEADER, DACL_SECURITY_INFORMATION, FILE_ATTRIBUTE_DIRECTORY,
            FILE_ATTRIBUTE_REPARSE_POINT, GROUP_SECURITY_INFORMATION, HANDLE,
            OWNER_SECURITY_INFORMATION, PACL, PSECURITY_DESCRIPTOR, PSID, SE_GROUP_DEFAULTED,
            SE_OWNER_DEFAULTED, TOKEN_QUERY, TOKEN_USER,
        },
    },
};

use crate::descriptor::{AccessMask, GrantEntry, GrantKind, Identity, PermissionDescriptor};
use crate::meta::{DirectoryAttributes, ObjectKind};
use crate::{Error, Result};

/// A pointer that was allocated by the system with `LocalAlloc`, and must
/// be released with `LocalFree`.
struct LocalBox(*mut c_void);

impl Drop for LocalBox {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from an API documented to return
            // LocalAlloc'd memory, and we free it once.
            unsafe {
                LocalFree(self.0);
            }
        }
    }
}

/// Convert `path` to a NUL-terminated wide string.
fn to_wide(path: &Path) -> Vec<u16> {
    path.as_os_str()
        .encode_wide()
        .chain(iter::once(0))
        .collect()
}

/// Convert a SID to an [`Identity`].
///
/// # Safety
///
/// `sid` must be null or point to a SID that stays valid for the duration of
/// the call.
unsafe fn sid_to_identity(sid: PSID) -> Identity {
    if sid.is_null() || IsValidSid(sid) == FALSE {
        return Identity::Invalid;
    }
    let mut string: *mut u16 = ptr::null_mut();
    if ConvertSidToStringSidW(sid, &mut string) == FALSE || string.is_null() {
        return Identity::Invalid;
    }
    let _guard = LocalBox(string.cast());
    let mut len = 0_usize;
    while *string.add(len) != 0 {
        len += 1;
    }
    let wide = std::slice::from_raw_parts(string, len);
    Identity::Sid(String::from_utf16_lossy(wide))
}

/// Look up the attributes of `path`, without following a final reparse
/// point.
pub(super) fn directory_attributes(path: &Path) -> Result<DirectoryAttributes> {
    let meta = path
        .symlink_metadata()
        .map_err(|e| Error::inspecting(e, path))?;
    let attributes = meta.file_attributes();
    let is_link = attributes & FILE_ATTRIBUTE_REPARSE_POINT != 0;
    let kind = if attributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
        ObjectKind::Directory
    } else if meta.file_type().is_file() {
        ObjectKind::File
    } else {
        ObjectKind::Other
    };

    let hard_link_count =
        hard_link_count(path).map_err(|e| Error::inspecting(e, path))?;

    // Querying the security descriptor of a reparse point would tell us
    // about its target instead; the engine doesn't need it anyway.
    let descriptor = if is_link {
        PermissionDescriptor::new(Identity::Invalid)
    } else {
        security_descriptor(path)?
    };

    Ok(DirectoryAttributes::new(
        descriptor,
        kind,
        is_link,
        hard_link_count,
    ))
}

/// Return the number of hard links to the object at `path`.
fn hard_link_count(path: &Path) -> io::Result<u64> {
    let file = std::fs::OpenOptions::new()
        .access_mode(0)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT)
        .open(path)?;
    // SAFETY: BY_HANDLE_FILE_INFORMATION is plain data; all-zeroes is valid.
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };
    // SAFETY: the handle is open for the duration of the call, and `info` is
    // a valid out-pointer.
    let ok = unsafe { GetFileInformationByHandle(file.as_raw_handle() as HANDLE, &mut info) };
    if ok == FALSE {
        return Err(io::Error::last_os_error());
    }
    Ok(u64::from(info.nNumberOfLinks))
}

/// Read the owner, group, and DACL of the object at `path`.
fn security_descriptor(path: &Path) -> Result<PermissionDescriptor> {
    let unreadable = |why: String| Error::UnreadableDescriptor(path.into(), why);
    let wide = to_wide(path);

    let mut owner: PSID = ptr::null_mut();
    let mut group: PSID = ptr::null_mut();
    let mut dacl: PACL = ptr::null_mut();
    let mut sd: PSECURITY_DESCRIPTOR = ptr::null_mut();

    // SAFETY: `wide` is NUL-terminated, and every out-pointer is valid.  On
    // success, `owner`, `group` and `dacl` point into `sd`, which we hold
    // until we're done with them.
    let rv = unsafe {
        GetNamedSecurityInfoW(
            wide.as_ptr(),
            SE_FILE_OBJECT,
            OWNER_SECURITY_INFORMATION | GROUP_SECURITY_INFORMATION | DACL_SECURITY_INFORMATION,
            &mut owner,
            &mut group,
            &mut dacl,
            ptr::null_mut(),
            &mut sd,
        )
    };
    if rv != ERROR_SUCCESS {
        return Err(unreadable(io::Error::from_raw_os_error(rv as i32).to_string()));
    }
    let _sd_guard = LocalBox(sd);

    let mut control = 0;
    let mut revision: DWORD = 0;
    // SAFETY: `sd` is a valid security descriptor.
    if unsafe { GetSecurityDescriptorControl(sd, &mut control, &mut revision) } == FALSE {
        return Err(unreadable(io::Error::last_os_error().to_string()));
    }

    // SAFETY: `owner` and `group` are null or point into `sd`.
    let (owner, group) = unsafe { (sid_to_identity(owner), sid_to_identity(group)) };
    let mut descriptor = PermissionDescriptor::new(owner)
        .with_group(group)
        .with_defaulted(
            control & SE_OWNER_DEFAULTED != 0,
            control & SE_GROUP_DEFAULTED != 0,
        );

    if dacl.is_null() {
        // A null DACL grants everybody everything.
        return Ok(descriptor.with_grant(GrantEntry::allow(
            Identity::sid("S-1-1-0"),
            AccessMask::GENERIC_ALL,
        )));
    }

    // SAFETY: `dacl` is non-null and points into `sd`.
    let count = unsafe { (*dacl).AceCount };
    for index in 0..count {
        let mut ace: *mut c_void = ptr::null_mut();
        // SAFETY: `index` is less than the ACE count of `dacl`.
        if unsafe { GetAce(dacl, DWORD::from(index), &mut ace) } == FALSE || ace.is_null() {
            return Err(unreadable(io::Error::last_os_error().to_string()));
        }
        // SAFETY: GetAce gave us a pointer to an ACE, which starts with a
        // header.  Allowed and denied ACEs share the ACCESS_ALLOWED_ACE
        // layout, with the SID stored in place at `SidStart`.
        let entry = unsafe {
            let header = &*(ace as *const ACE_HEADER);
            match header.AceType {
                ACCESS_ALLOWED_ACE_TYPE | ACCESS_DENIED_ACE_TYPE => {
                    let body = &*(ace as *const ACCESS_ALLOWED_ACE);
                    let kind = if header.AceType == ACCESS_ALLOWED_ACE_TYPE {
                        GrantKind::Allow
                    } else {
                        GrantKind::Deny
                    };
                    GrantEntry::new(
                        kind,
                        header.AceFlags,
                        header.AceSize,
                        sid_to_identity(&body.SidStart as *const DWORD as PSID),
                        AccessMask::from(body.Mask),
                    )
                }
                // Object and callback ACEs can allow access in ways we don't
                // parse.  Assume the worst.
                other => GrantEntry::new(
                    GrantKind::Other(other),
                    header.AceFlags,
                    header.AceSize,
                    Identity::Invalid,
                    AccessMask::GENERIC_ALL,
                ),
            }
        };
        descriptor = descriptor.with_grant(entry);
    }

    Ok(descriptor)
}

/// Return the SID of the user that this process runs as.
pub(super) fn current_user() -> Option<Identity> {
    let mut token: HANDLE = ptr::null_mut();
    // SAFETY: GetCurrentProcess returns a pseudo-handle; `token` is a valid
    // out-pointer.
    if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) } == FALSE {
        return None;
    }

    let mut len: DWORD = 0;
    // SAFETY: asking for the required length with a null buffer.
    unsafe {
        GetTokenInformation(token, TokenUser, ptr::null_mut(), 0, &mut len);
    }
    // Use u64s so that the TOKEN_USER we read out of it is aligned.
    let mut buf = vec![0_u64; (len as usize + 7) / 8];
    // SAFETY: `buf` holds at least `len` bytes.
    let ok = unsafe {
        GetTokenInformation(token, TokenUser, buf.as_mut_ptr().cast(), len, &mut len)
    };
    // SAFETY: `token` came from OpenProcessToken and is closed once.
    unsafe {
        CloseHandle(token);
    }
    if ok == FALSE {
        return None;
    }
    // SAFETY: on success, `buf` starts with a TOKEN_USER whose SID points
    // into `buf`.
    Some(unsafe {
        let user = &*(buf.as_ptr() as *const TOKEN_USER);
        sid_to_identity(user.User.Sid)
    })
}

/// Return the root of the drive holding the Windows directory.
pub(super) fn system_volume_root() -> Option<PathBuf> {
    let mut buf = vec![0_u16; MAX_PATH + 1];
    // SAFETY: `buf` is writable for its full length.
    let n = unsafe { GetWindowsDirectoryW(buf.as_mut_ptr(), buf.len() as u32) } as usize;
    if n == 0 || n >= buf.len() {
        return None;
    }
    let windir = PathBuf::from(OsString::from_wide(&buf[..n]));
    windir.ancestors().last().map(Path::to_path_buf)
}
