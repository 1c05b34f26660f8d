use async_trait::async_trait;
use log::trace;
use tokio::fs;

/// Station parquet files live at `{data_dir}/{station_id}/*.parquet`.
pub struct FileAccess {
    data_dir: String,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(String),
}

#[async_trait]
pub trait FileData: Send + Sync {
    /// All parquet files holding a station's measurements, sorted by path.
    /// A station without a folder has no files.
    async fn station_files(&self, station_id: &str) -> Result<Vec<String>, Error>;
    fn station_folder(&self, station_id: &str) -> String;
}

impl FileAccess {
    pub fn new(data_dir: String) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl FileData for FileAccess {
    fn station_folder(&self, station_id: &str) -> String {
        format!("{}/{}", self.data_dir, station_id)
    }

    async fn station_files(&self, station_id: &str) -> Result<Vec<String>, Error> {
        let folder = self.station_folder(station_id);
        let mut file_paths = vec![];
        let mut entries = match fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("no data folder for station {}", station_id);
                return Ok(file_paths);
            }
            Err(e) => return Err(Error::Io(format!("{}: {}", folder, e))),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Io(format!("{}: {}", folder, e)))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(filename) = entry.file_name().to_str() {
                if filename.ends_with(".parquet") {
                    trace!("found station file: {}", filename);
                    file_paths.push(format!("{}/{}", folder, filename));
                }
            }
        }
        file_paths.sort();
        Ok(file_paths)
    }
}
