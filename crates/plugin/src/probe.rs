//! Finding overlay processes that are already running.

use tracing::debug;

/// Answers "is a sibling overlay alive", and which processes those are.
pub trait OverlayProbe {
    fn overlay_pids(&self) -> Vec<u32>;

    fn is_overlay_alive(&self) -> bool {
        !self.overlay_pids().is_empty()
    }
}

/// Scans the OS process table for processes running a given executable.
///
/// Only the executable's file stem is compared, case-insensitively and
/// exactly: the image name on Windows, `argv[0]` elsewhere. Arguments are
/// never looked at, so a shell or editor that merely mentions the name does
/// not match.
pub struct ProcessTableProbe {
    executable: String,
}

impl ProcessTableProbe {
    pub fn new(executable: &str) -> Self {
        Self { executable: executable.to_lowercase() }
    }

    fn matches(&self, program: &str) -> bool {
        // Image names and Windows paths can appear on any platform.
        let file_name = program
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(program)
            .to_lowercase();
        let stem = file_name.strip_suffix(".exe").unwrap_or(&file_name);
        stem == self.executable
    }
}

impl OverlayProbe for ProcessTableProbe {
    fn overlay_pids(&self) -> Vec<u32> {
        let own = std::process::id();
        let pids: Vec<u32> = enumerate_processes()
            .into_iter()
            .filter(|p| p.pid != own && self.matches(&p.program))
            .map(|p| p.pid)
            .collect();
        if !pids.is_empty() {
            debug!("Found existing overlay processes: {pids:?}");
        }
        pids
    }
}

struct ProcessInfo {
    pid: u32,
    /// Image name or path of the running executable.
    program: String,
}

#[cfg(windows)]
fn enumerate_processes() -> Vec<ProcessInfo> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
        TH32CS_SNAPPROCESS,
    };

    let mut procs = Vec::new();
    unsafe {
        let Ok(snapshot) = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) else {
            tracing::warn!("Failed to create process snapshot");
            return procs;
        };

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let zero_idx = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                procs.push(ProcessInfo {
                    pid: entry.th32ProcessID,
                    program: String::from_utf16_lossy(&entry.szExeFile[..zero_idx]),
                });

                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
    }
    procs
}

#[cfg(not(windows))]
fn enumerate_processes() -> Vec<ProcessInfo> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let pid: u32 = entry.file_name().to_str()?.parse().ok()?;
            // Processes we may not inspect, or that exited mid-scan, are skipped.
            let raw = std::fs::read(entry.path().join("cmdline")).ok()?;
            let argv0 = raw.split(|&b| b == 0).next().filter(|arg| !arg.is_empty())?;
            Some(ProcessInfo { pid, program: String::from_utf8_lossy(argv0).into_owned() })
        })
        .collect()
}

/// Ask the OS to end `pid`. Returns whether the request was accepted.
#[cfg(windows)]
pub fn terminate(pid: u32) -> bool {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) else {
            return false;
        };
        let ok = TerminateProcess(handle, 0).is_ok();
        let _ = CloseHandle(handle);
        ok
    }
}

#[cfg(not(windows))]
pub fn terminate(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}
