//! Linux kernel keyring adapter.
//!
//! Keys are `user`-type keys whose description is the cache name. They live in
//! the user keyring, or in the user's persistent keyring when the kernel
//! supports it (survives logout, not reboot). Talks to the kernel through
//! `add_key(2)` and `keyctl(2)` directly.

use crate::error::{KeyringError, KeyringResult};
use crate::store::{KeyId, SecretStore};
use std::ffi::CString;
use std::io;
use tracing::{debug, warn};
use zeroize::Zeroizing;

// <linux/keyctl.h>
const KEY_SPEC_SESSION_KEYRING: libc::c_long = -3;
const KEY_SPEC_USER_KEYRING: libc::c_long = -4;
const KEYCTL_GET_KEYRING_ID: libc::c_long = 0;
const KEYCTL_LINK: libc::c_long = 8;
const KEYCTL_UNLINK: libc::c_long = 9;
const KEYCTL_SEARCH: libc::c_long = 10;
const KEYCTL_READ: libc::c_long = 11;
const KEYCTL_GET_PERSISTENT: libc::c_long = 22;

const KEY_TYPE_USER: &std::ffi::CStr = c"user";

/// Keys stored in the kernel keyring of the current user.
pub struct KernelKeyring {
    ring: libc::c_long,
}

impl KernelKeyring {
    /// Resolves the keyring that will hold cache keys.
    ///
    /// Fails with [`KeyringError::Unavailable`] when the user keyring can't be
    /// resolved; linking and persistent-keyring promotion are best effort.
    pub fn new() -> KeyringResult<Self> {
        let user = keyctl(KEYCTL_GET_KEYRING_ID, KEY_SPEC_USER_KEYRING, 1, 0, 0)
            .map_err(|e| KeyringError::Unavailable(format!("user keyring: {e}")))?;

        // Without this link, processes in a fresh session can't search the
        // user keyring. The user keyring still works when it fails.
        if let Err(e) = keyctl(KEYCTL_LINK, KEY_SPEC_USER_KEYRING, KEY_SPEC_SESSION_KEYRING, 0, 0) {
            warn!(error = %e, "couldn't link user keyring into session keyring");
        }

        let ring = match keyctl(KEYCTL_GET_PERSISTENT, -1, user, 0, 0) {
            Ok(persistent) => {
                debug!(keyring = persistent, "using persistent keyring");
                persistent
            }
            Err(e) => {
                debug!(error = %e, keyring = user, "persistent keyring unsupported; using user keyring");
                user
            }
        };
        Ok(Self { ring })
    }

    /// The serial number of the keyring keys are added to.
    pub fn keyring_id(&self) -> i64 {
        self.ring as i64
    }
}

impl SecretStore for KernelKeyring {
    fn create(&self, name: &str, payload: &[u8]) -> KeyringResult<KeyId> {
        let desc = description(name)?;
        // SAFETY: all pointers are valid for the duration of the call and the
        // payload length matches the buffer.
        let ret = unsafe {
            libc::syscall(
                libc::SYS_add_key,
                KEY_TYPE_USER.as_ptr(),
                desc.as_ptr(),
                payload.as_ptr() as *const libc::c_void,
                payload.len(),
                self.ring,
            )
        };
        if ret < 0 {
            return Err(classify("add_key", name, io::Error::last_os_error()));
        }
        Ok(KeyId(ret as i64))
    }

    fn find(&self, name: &str) -> KeyringResult<KeyId> {
        let desc = description(name)?;
        keyctl(
            KEYCTL_SEARCH,
            self.ring,
            KEY_TYPE_USER.as_ptr() as libc::c_long,
            desc.as_ptr() as libc::c_long,
            0,
        )
        .map(|id| KeyId(id as i64))
        .map_err(|e| classify("keyctl search", name, e))
    }

    fn read(&self, id: KeyId) -> KeyringResult<Zeroizing<Vec<u8>>> {
        let label = id.to_string();
        let mut buf = Zeroizing::new(vec![0u8; 64]);
        loop {
            let len = keyctl(
                KEYCTL_READ,
                id.0 as libc::c_long,
                buf.as_mut_ptr() as libc::c_long,
                buf.len() as libc::c_long,
                0,
            )
            .map_err(|e| classify("keyctl read", &label, e))? as usize;

            // the kernel reports the full size when the buffer was too small
            if len <= buf.len() {
                buf.truncate(len);
                return Ok(buf);
            }
            buf = Zeroizing::new(vec![0u8; len]);
        }
    }

    fn delete(&self, id: KeyId) -> KeyringResult<()> {
        keyctl(KEYCTL_UNLINK, id.0 as libc::c_long, self.ring, 0, 0)
            .map(|_| ())
            .map_err(|e| classify("keyctl unlink", &id.to_string(), e))
    }
}

fn keyctl(
    op: libc::c_long,
    arg2: libc::c_long,
    arg3: libc::c_long,
    arg4: libc::c_long,
    arg5: libc::c_long,
) -> io::Result<libc::c_long> {
    // SAFETY: keyctl only dereferences pointer arguments that callers pass
    // from live buffers sized by the accompanying length argument.
    let ret = unsafe { libc::syscall(libc::SYS_keyctl, op, arg2, arg3, arg4, arg5) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

fn description(name: &str) -> KeyringResult<CString> {
    CString::new(name).map_err(|_| {
        KeyringError::Os {
            op: "key description",
            source: io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"),
        }
    })
}

fn classify(op: &'static str, what: &str, err: io::Error) -> KeyringError {
    match err.raw_os_error() {
        Some(libc::ENOKEY) | Some(libc::ENOENT) => KeyringError::KeyNotFound(what.to_string()),
        Some(libc::EKEYEXPIRED) | Some(libc::EKEYREVOKED) | Some(libc::EKEYREJECTED) => {
            KeyringError::KeyInvalid(format!("{what}: {err}"))
        }
        Some(libc::ENOSYS) => KeyringError::Unavailable(format!("{op}: {err}")),
        _ => KeyringError::Os { op, source: err },
    }
}
