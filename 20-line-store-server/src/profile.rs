//! Deployment profiles sharing one connection lifecycle.
//!
//! A profile fixes the seed data, the payload grammar, the wording of every
//! reply and the framing of a `READ` response. Nothing else differs between
//! the two deployments.

use std::net::{Ipv4Addr, SocketAddr};

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Free-form text lines, numbered and paced on `READ`.
    Generic,
    /// `KEY=value;` status records with counted `READ` framing.
    Logs,
}

/// What a session does after answering a `READ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterRead {
    Close,
    AwaitCommand,
}

const GENERIC_SEED: &[&str] = &[
    "Это первая строка файла",
    "Вторая строка содержит важную информацию",
    "Третья строка для тестирования TCP передачи",
    "Четвертая строка с секретными данными: password123",
    "Пятая строка завершает наш тестовый файл",
];

const LOGS_SEED: &[&str] = &[
    "NAME=proto-001;STATUS=health;COMMAND=system_startup_complete",
    "NAME=proto-002;STATUS=health;COMMAND=scanner_calibration_ok",
    "NAME=proto-003;STATUS=danger;COMMAND=unauthorized_access_attempt",
    "NAME=proto-004;STATUS=health;COMMAND=data_backup_completed",
    "NAME=proto-005;STATUS=danger;COMMAND=anomaly_detected_sector_7",
];

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Generic => "generic",
            Profile::Logs => "logs",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Profile::Generic => 8080,
            Profile::Logs => 8001,
        }
    }

    pub fn default_listen(self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.default_port()))
    }

    pub fn default_store_path(self) -> &'static str {
        match self {
            Profile::Generic => "data.txt",
            Profile::Logs => "logs.txt",
        }
    }

    /// Lines written into a freshly created store.
    pub fn seed_lines(self) -> &'static [&'static str] {
        match self {
            Profile::Generic => GENERIC_SEED,
            Profile::Logs => LOGS_SEED,
        }
    }

    pub fn banner(self) -> [&'static str; 2] {
        match self {
            Profile::Generic => [
                "TCP File Server - file transfer active",
                "Commands: READ | WRITE:your_text",
            ],
            Profile::Logs => [
                "OmniScan Logs System v2.1 - omniscan logs monitoring active",
                "Commands: READ | WRITE:KEY=value;",
            ],
        }
    }

    /// Default end-of-read behaviour. The generic deployment serves a single
    /// `READ` per connection; the logs deployment keeps the session going.
    pub fn after_read(self) -> AfterRead {
        match self {
            Profile::Generic => AfterRead::Close,
            Profile::Logs => AfterRead::AwaitCommand,
        }
    }

    /// Logs input is whitespace-trimmed; generic input only loses its line ending.
    pub fn trims_input(self) -> bool {
        matches!(self, Profile::Logs)
    }

    pub fn unknown_command(self) -> &'static str {
        match self {
            Profile::Generic => "Unknown command. Use 'READ' or 'WRITE:your_text'",
            Profile::Logs => "Unknown command. Use READ or WRITE:KEY=value;",
        }
    }

    pub fn missing_store(self) -> &'static str {
        match self {
            Profile::Generic => "File not found",
            Profile::Logs => "Logs file not found",
        }
    }

    pub fn write_failed(self, detail: &str) -> String {
        match self {
            Profile::Generic => format!("Failed to write to file - {detail}"),
            Profile::Logs => detail.to_string(),
        }
    }

    pub fn write_ok(self, line: &str) -> String {
        match self {
            Profile::Generic => format!("Written '{line}' to file"),
            Profile::Logs => "Log entry added".to_string(),
        }
    }
}

pub const NO_DATA: &str = "No data provided for WRITE command";
pub const INVALID_FORMAT: &str = "Invalid format. Use WRITE:KEY=value;";
