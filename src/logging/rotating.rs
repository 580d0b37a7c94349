// 滚动文件输出
// 按大小滚动，按数量和天数清理旧文件，可选 gzip 压缩

use crate::config::LoggerConfig;
use crate::logging::LevelWrite;
use chrono::{Duration, NaiveDateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

const MEGABYTE: u64 = 1024 * 1024;
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

/// 滚动参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOptions {
    /// 单个文件的最大字节数
    pub max_size: u64,
    /// 备份保留天数，0 表示不按时间清理
    pub max_age_days: u64,
    /// 备份保留个数，0 表示全部保留
    pub max_backups: usize,
    /// 压缩备份文件
    pub compress: bool,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE_MB * MEGABYTE,
            max_age_days: 0,
            max_backups: 0,
            compress: false,
        }
    }
}

impl RotationOptions {
    /// 从日志配置读取滚动参数，大小为 0 时使用默认 100 MB
    pub fn from_config(config: &LoggerConfig) -> Self {
        let max_size_mb = match config.rotation_max_size_mb {
            0 => DEFAULT_MAX_SIZE_MB,
            mb => mb,
        };

        Self {
            max_size: max_size_mb.saturating_mul(MEGABYTE),
            max_age_days: config.max_age_days,
            max_backups: config.max_backups,
            compress: config.compress,
        }
    }
}

#[derive(Debug, Default)]
struct SinkState {
    file: Option<File>,
    size: u64,
    last_backup: Option<NaiveDateTime>,
}

/// 单个级别的滚动日志文件
///
/// 构造时不做任何 IO，文件和目录在第一次写入时创建，
/// 打开或滚动失败会作为该次写入的错误返回。
/// 旧备份的删除和压缩在后台清理线程中进行，不占用写入锁。
#[derive(Debug)]
pub struct RotatingFileSink {
    backups: Arc<BackupSet>,
    state: Mutex<SinkState>,
    miller: Mutex<Option<Miller>>,
}

impl RotatingFileSink {
    pub fn new(filename: impl Into<PathBuf>, options: RotationOptions) -> Self {
        Self {
            backups: Arc::new(BackupSet {
                filename: filename.into(),
                options,
            }),
            state: Mutex::new(SinkState::default()),
            miller: Mutex::new(None),
        }
    }

    /// 当前日志文件路径
    pub fn path(&self) -> &Path {
        &self.backups.filename
    }

    /// 写入一行，返回写入长度和本次是否发生了滚动
    fn write_locked(&self, state: &mut SinkState, buf: &[u8]) -> io::Result<(usize, bool)> {
        let max_size = self.backups.options.max_size;
        let len = buf.len() as u64;
        if len > max_size {
            return Err(io::Error::other(format!(
                "写入长度 {} 超过单个文件上限 {}",
                len, max_size
            )));
        }

        if state.file.is_none() {
            self.open_existing_or_new(state)?;
        }

        let mut rotated = false;
        if state.size + len > max_size {
            self.rotate_locked(state)?;
            rotated = true;
        }

        let file = state
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("日志文件未打开"))?;
        file.write_all(buf)?;
        state.size += len;

        Ok((buf.len(), rotated))
    }

    fn open_existing_or_new(&self, state: &mut SinkState) -> io::Result<()> {
        let filename = &self.backups.filename;
        match fs::metadata(filename) {
            Ok(meta) => {
                let file = OpenOptions::new().append(true).open(filename)?;
                state.file = Some(file);
                state.size = meta.len();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.open_new(state),
            Err(e) => Err(e),
        }
    }

    /// 把已有文件改名为备份，再创建新的空文件
    fn open_new(&self, state: &mut SinkState) -> io::Result<()> {
        let filename = &self.backups.filename;
        if let Some(dir) = filename.parent() {
            fs::create_dir_all(dir)?;
        }

        if filename.exists() {
            let (backup, at) = self.backups.next_backup_name(state.last_backup);
            fs::rename(filename, backup)?;
            state.last_backup = Some(at);
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(filename)?;
        state.file = Some(file);
        state.size = 0;

        Ok(())
    }

    fn rotate_locked(&self, state: &mut SinkState) -> io::Result<()> {
        if let Some(mut file) = state.file.take() {
            file.flush()?;
        }

        self.open_new(state)
    }

    /// 通知清理线程处理旧备份，线程在第一次滚动时启动
    fn request_mill(&self) {
        if !self.backups.needs_mill() {
            return;
        }

        let mut miller = self.miller.lock().unwrap_or_else(PoisonError::into_inner);
        if miller.is_none() {
            match Miller::spawn(Arc::clone(&self.backups)) {
                Ok(spawned) => *miller = Some(spawned),
                Err(e) => {
                    eprintln!("fanlog: 无法启动清理线程: {}", e);
                    return;
                }
            }
        }

        // 队列已满时已有一次清理在等待，它会看到这次滚动产生的备份
        if let Some(miller) = miller.as_ref() {
            let _ = miller.sender.try_send(());
        }
    }
}

impl LevelWrite for RotatingFileSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let (written, rotated) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            self.write_locked(&mut state, buf)?
        };

        if rotated {
            self.request_mill();
        }

        Ok(written)
    }
}

impl Drop for RotatingFileSink {
    /// 等待排队中的清理完成
    fn drop(&mut self) {
        let miller = self
            .miller
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Miller { sender, handle }) = miller {
            drop(sender);
            let _ = handle.join();
        }
    }
}

/// 后台清理线程
#[derive(Debug)]
struct Miller {
    sender: SyncSender<()>,
    handle: JoinHandle<()>,
}

impl Miller {
    fn spawn(backups: Arc<BackupSet>) -> io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel::<()>(1);
        let handle = thread::Builder::new()
            .name("fanlog-mill".to_string())
            .spawn(move || {
                while receiver.recv().is_ok() {
                    if let Err(e) = backups.mill() {
                        eprintln!(
                            "fanlog: 清理滚动文件失败 {}: {}",
                            backups.filename.display(),
                            e
                        );
                    }
                }
            })?;

        Ok(Self { sender, handle })
    }
}

/// 日志文件路径与它的备份规则
#[derive(Debug)]
struct BackupSet {
    filename: PathBuf,
    options: RotationOptions,
}

impl BackupSet {
    fn needs_mill(&self) -> bool {
        let options = &self.options;
        options.max_backups > 0 || options.max_age_days > 0 || options.compress
    }

    fn name_parts(&self) -> (String, String) {
        let stem = self
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .filename
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    fn directory(&self) -> PathBuf {
        match self.filename.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// 生成不与现有备份冲突的备份文件名，时间戳严格晚于上一次备份
    fn next_backup_name(&self, last: Option<NaiveDateTime>) -> (PathBuf, NaiveDateTime) {
        let (stem, ext) = self.name_parts();
        let dir = self.directory();
        let mut at = Utc::now().naive_utc();
        if let Some(last) = last {
            at = at.max(last + Duration::milliseconds(1));
        }

        loop {
            let name = format!("{}-{}{}", stem, at.format(BACKUP_TIME_FORMAT), ext);
            let candidate = dir.join(&name);
            let compressed = dir.join(format!("{}{}", name, COMPRESS_SUFFIX));
            if !candidate.exists() && !compressed.exists() {
                return (candidate, at);
            }
            at += Duration::milliseconds(1);
        }
    }

    /// 列出备份文件，按时间从新到旧排序
    fn list(&self) -> io::Result<Vec<Backup>> {
        let (stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);
        let compressed_ext = format!("{}{}", ext, COMPRESS_SUFFIX);
        let mut backups = Vec::new();

        for entry in fs::read_dir(self.directory())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };

            let (stamp, compressed) = if let Some(s) = rest.strip_suffix(compressed_ext.as_str()) {
                (s, true)
            } else if let Some(s) = rest.strip_suffix(ext.as_str()) {
                (s, false)
            } else {
                continue;
            };

            if let Ok(timestamp) = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT) {
                backups.push(Backup {
                    path: entry.path(),
                    timestamp,
                    compressed,
                });
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// 按天数计算的过期时间点，超出时间范围时返回 None，即全部保留
    fn age_cutoff(&self) -> Option<NaiveDateTime> {
        let days = i64::try_from(self.options.max_age_days).ok()?;
        let age = Duration::try_days(days)?;
        Utc::now().naive_utc().checked_sub_signed(age)
    }

    /// 按数量和天数删除旧备份，并压缩剩余的未压缩备份
    fn mill(&self) -> io::Result<()> {
        let options = &self.options;
        let mut remaining = self.list()?;
        let mut expired = Vec::new();

        if options.max_backups > 0 && remaining.len() > options.max_backups {
            expired.extend(remaining.split_off(options.max_backups));
        }

        if options.max_age_days > 0 {
            if let Some(cutoff) = self.age_cutoff() {
                let (keep, old): (Vec<_>, Vec<_>) =
                    remaining.into_iter().partition(|b| b.timestamp >= cutoff);
                remaining = keep;
                expired.extend(old);
            }
        }

        let mut first_error = None;

        for backup in expired {
            if let Err(e) = fs::remove_file(&backup.path) {
                first_error.get_or_insert(e);
            }
        }

        if options.compress {
            for backup in remaining.iter().filter(|b| !b.compressed) {
                if let Err(e) = compress_log_file(&backup.path) {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
struct Backup {
    path: PathBuf,
    timestamp: NaiveDateTime,
    compressed: bool,
}

/// 使用 gzip 压缩文件并删除原文件
fn compress_log_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path.as_os_str().to_os_string();
    gz_name.push(COMPRESS_SUFFIX);
    let gz_path = PathBuf::from(gz_name);

    let mut source = File::open(path)?;
    let file = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn small(max_size: u64) -> RotationOptions {
        RotationOptions {
            max_size,
            ..RotationOptions::default()
        }
    }

    fn backup_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != "Info.log")
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_construction_is_lazy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("INFO").join("Info.log");

        let sink = RotatingFileSink::new(&path, RotationOptions::default());

        assert_eq!(sink.path(), path.as_path());
        assert!(!dir.path().join("INFO").exists());
    }

    #[test]
    fn test_first_write_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("INFO").join("Info.log");
        let sink = RotatingFileSink::new(&path, RotationOptions::default());

        sink.write(b"foo\n").unwrap();
        sink.write(b"bar\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "foo\nbar\n");
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        fs::write(&path, "old\n").unwrap();

        let sink = RotatingFileSink::new(&path, RotationOptions::default());
        sink.write(b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_rotates_on_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let sink = RotatingFileSink::new(&path, small(8));

        sink.write(b"foo\n").unwrap();
        sink.write(b"bar\n").unwrap();
        sink.write(b"lol\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "lol\n");

        let backups = backup_files(dir.path());
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("Info-"));
        assert!(backups[0].ends_with(".log"));
        let content = fs::read_to_string(dir.path().join(&backups[0])).unwrap();
        assert_eq!(content, "foo\nbar\n");
    }

    #[test]
    fn test_write_larger_than_max_size_fails() {
        let dir = TempDir::new().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("Info.log"), small(4));

        assert!(sink.write(b"too long\n").is_err());
    }

    #[test]
    fn test_max_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationOptions {
                max_size: 4,
                max_backups: 2,
                ..RotationOptions::default()
            },
        );

        for line in ["a1\n", "b2\n", "c3\n", "d4\n", "e5\n"] {
            sink.write(line.as_bytes()).unwrap();
        }
        drop(sink);

        assert_eq!(fs::read_to_string(&path).unwrap(), "e5\n");
        let backups = backup_files(dir.path());
        assert_eq!(backups.len(), 2);
        let contents: Vec<String> = backups
            .iter()
            .map(|n| fs::read_to_string(dir.path().join(n)).unwrap())
            .collect();
        assert_eq!(contents, vec!["c3\n", "d4\n"]);
    }

    #[test]
    fn test_max_age_removes_old_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let stale = dir.path().join("Info-2000-01-01T00-00-00.000.log");
        fs::write(&stale, "ancient\n").unwrap();

        let sink = RotatingFileSink::new(
            &path,
            RotationOptions {
                max_size: 4,
                max_age_days: 1,
                ..RotationOptions::default()
            },
        );
        sink.write(b"a1\n").unwrap();
        sink.write(b"b2\n").unwrap();
        drop(sink);

        assert!(!stale.exists());
        assert_eq!(backup_files(dir.path()).len(), 1);
    }

    #[test]
    fn test_compress_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationOptions {
                max_size: 4,
                compress: true,
                ..RotationOptions::default()
            },
        );

        sink.write(b"a1\n").unwrap();
        sink.write(b"b2\n").unwrap();
        drop(sink);

        let backups = backup_files(dir.path());
        assert_eq!(backups.len(), 1);
        assert!(backups[0].ends_with(".log.gz"));

        let file = File::open(dir.path().join(&backups[0])).unwrap();
        let mut content = String::new();
        GzDecoder::new(file).read_to_string(&mut content).unwrap();
        assert_eq!(content, "a1\n");
    }

    #[test]
    fn test_unrelated_files_are_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let other = dir.path().join("notes.txt");
        fs::write(&other, "keep").unwrap();

        let sink = RotatingFileSink::new(
            &path,
            RotationOptions {
                max_size: 4,
                max_backups: 1,
                max_age_days: 1,
                ..RotationOptions::default()
            },
        );
        for line in ["a1\n", "b2\n", "c3\n"] {
            sink.write(line.as_bytes()).unwrap();
        }
        drop(sink);

        assert!(other.exists());
    }

    #[test]
    fn test_huge_max_age_keeps_backups() {
        for max_age_days in [100_000_000, 1_000_000_000_000, u64::MAX] {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("Info.log");
            let stale = dir.path().join("Info-2000-01-01T00-00-00.000.log");
            fs::write(&stale, "ancient\n").unwrap();

            let sink = RotatingFileSink::new(
                &path,
                RotationOptions {
                    max_size: 4,
                    max_age_days,
                    ..RotationOptions::default()
                },
            );
            sink.write(b"a1\n").unwrap();
            sink.write(b"b2\n").unwrap();
            drop(sink);

            assert!(stale.exists());
            assert_eq!(backup_files(dir.path()).len(), 2);
        }
    }

    #[test]
    fn test_compress_every_rotated_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationOptions {
                max_size: 4,
                compress: true,
                ..RotationOptions::default()
            },
        );

        for line in ["a1\n", "b2\n", "c3\n", "d4\n"] {
            sink.write(line.as_bytes()).unwrap();
        }
        drop(sink);

        let backups = backup_files(dir.path());
        assert_eq!(backups.len(), 3);
        assert!(backups.iter().all(|name| name.ends_with(".log.gz")));
        assert_eq!(fs::read_to_string(&path).unwrap(), "d4\n");
    }

    #[test]
    fn test_options_from_config() {
        let config = LoggerConfig {
            rotation_max_size_mb: 0,
            max_age_days: 7,
            max_backups: 3,
            compress: true,
            ..LoggerConfig::default()
        };

        let options = RotationOptions::from_config(&config);

        assert_eq!(options.max_size, 100 * MEGABYTE);
        assert_eq!(options.max_age_days, 7);
        assert_eq!(options.max_backups, 3);
        assert!(options.compress);
    }
}
