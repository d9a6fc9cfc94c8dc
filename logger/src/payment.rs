use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use common::tier::PaymentProcessor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TRANSACTION_LOG: &str = "payment_transactions.log";
const ERROR_LOG: &str = "payment_errors.log";

/// One line of a payment log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub provider: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// Append-only JSON-lines audit trail of billing actions, kept apart from the
/// application log so it can be inspected by administrators.
pub struct PaymentLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl PaymentLog {
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(PaymentLog {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn log_transaction(
        &self,
        action: &str,
        provider: PaymentProcessor,
        user_id: &str,
        data: Value,
    ) {
        let entry = PaymentLogEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            provider: provider.to_string(),
            user_id: user_id.to_string(),
            error: None,
            data,
        };
        self.append(TRANSACTION_LOG, &entry);
    }

    pub fn log_error(
        &self,
        action: &str,
        provider: PaymentProcessor,
        user_id: Option<&str>,
        error: &dyn std::fmt::Display,
        data: Value,
    ) {
        log::error!("{} ({}) failed: {}", action, provider, error);
        let entry = PaymentLogEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            provider: provider.to_string(),
            user_id: user_id.unwrap_or("unknown").to_string(),
            error: Some(error.to_string()),
            data,
        };
        self.append(ERROR_LOG, &entry);
    }

    /// Latest `count` entries, newest first. Unreadable lines are skipped.
    pub fn recent(&self, count: usize, errors_only: bool) -> io::Result<Vec<PaymentLogEntry>> {
        let file = if errors_only { ERROR_LOG } else { TRANSACTION_LOG };
        let contents = match fs::read_to_string(self.dir.join(file)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        Ok(contents
            .lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(count)
            .collect())
    }

    fn append(&self, file: &str, entry: &PaymentLogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to serialize payment log entry: {}", e);
                return;
            }
        };

        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
            .and_then(|mut f| writeln!(f, "{}", line));
        if let Err(e) = result {
            log::error!("Failed to write {}: {}", file, e);
        }
    }
}
