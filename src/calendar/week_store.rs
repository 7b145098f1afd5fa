use std::{
    collections::BTreeMap,
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    ops::Deref,
    path::{Path, PathBuf},
};

use fs4::fs_std::FileExt;
use tracing::{debug, warn};

use super::entities::CalendarTaskInstance;

/// Storage key the calendar data lives under. Readers of change
/// notifications compare against this to ignore unrelated keys.
pub const STORAGE_KEY: &str = "yearcompass-calendar-tasks";

/// The full persisted state: every week ever written, keyed by
/// `"<year>-W<week>"`. Weeks never written are simply absent and load as
/// empty lists.
pub type WeekMap = BTreeMap<String, Vec<CalendarTaskInstance>>;

/// Read/write boundary to durable storage. Deliberately infallible: the
/// in-memory view stays authoritative for the session, so an unreadable
/// medium degrades to an empty mapping and a failed write is dropped after
/// logging. Callers always do whole-mapping read-modify-write.
#[cfg_attr(test, mockall::automock)]
pub trait WeekStore {
    fn load(&self) -> WeekMap;

    fn save(&self, map: &WeekMap);
}

impl<T: Deref> WeekStore for T
where
    T::Target: WeekStore,
{
    fn load(&self) -> WeekMap {
        self.deref().load()
    }

    fn save(&self, map: &WeekMap) {
        self.deref().save(map)
    }
}

/// The main realization of [WeekStore]: a single JSON file in the
/// application directory, shared-locked for reads and exclusively locked
/// for writes so concurrent processes never observe a torn file. Locking
/// does not serialize read-modify-write cycles; the last writer wins.
pub struct JsonWeekStore {
    path: PathBuf,
}

impl JsonWeekStore {
    pub fn new(application_dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(application_dir)?;

        Ok(Self {
            path: application_dir.join(format!("{STORAGE_KEY}.json")),
        })
    }

    fn load_inner(&self) -> Result<WeekMap, std::io::Error> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(WeekMap::new()),
            Err(e) => return Err(e),
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        FileExt::unlock(&file)?;
        read?;

        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                // Treated the same as an absent file so a half-written
                // record after a crash never takes the calendar down.
                warn!("Malformed week data in {:?}: {e}", self.path);
                Ok(WeekMap::new())
            }
        }
    }

    fn save_inner(&self, map: &WeekMap) -> Result<(), std::io::Error> {
        let mut file = std::fs::File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let written = (|| {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&serde_json::to_vec(map)?)?;
            file.flush()
        })();
        FileExt::unlock(&file)?;
        written
    }
}

impl WeekStore for JsonWeekStore {
    fn load(&self) -> WeekMap {
        match self.load_inner() {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to read week data from {:?}: {e}", self.path);
                WeekMap::new()
            }
        }
    }

    fn save(&self, map: &WeekMap) {
        match self.save_inner(map) {
            Ok(()) => debug!("Saved {} week entries to {:?}", map.len(), self.path),
            Err(e) => {
                // Fire-and-forget durability: the session keeps running on
                // its in-memory state and only loses the write on restart.
                warn!("Failed to save week data to {:?}: {e}", self.path);
            }
        }
    }
}
