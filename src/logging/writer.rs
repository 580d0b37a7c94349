// 分级写入器
// 每个文件输出只接收自己级别的事件，多个写入器组合成一个扇出写入器

use fanlog_common::Level;
use std::io;
use std::sync::Arc;

/// 感知级别的写入器
///
/// 实现需要自行处理并发写入，所有方法都接收 `&self`。
pub trait LevelWrite: Send + Sync {
    /// 写入一条不带级别信息的记录
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// 写入一条指定级别的记录，默认忽略级别
    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        let _ = level;
        self.write(buf)
    }
}

impl<T: LevelWrite + ?Sized> LevelWrite for Arc<T> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        (**self).write_level(level, buf)
    }
}

impl<T: LevelWrite + ?Sized> LevelWrite for Box<T> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        (**self).write_level(level, buf)
    }
}

/// 级别过滤写入器
///
/// 只转发与绑定级别相同的事件。其他级别的事件不写入，但报告完整写入成功，
/// 这样扇出写入器在逐个调用时不会因为无关的输出而中断。
/// 被过滤掉的事件不会触碰底层写入器，因此也不会暴露它的错误。
#[derive(Debug)]
pub struct LevelFilterWriter<W> {
    inner: W,
    level: Level,
}

impl<W: LevelWrite> LevelFilterWriter<W> {
    pub fn new(inner: W, level: Level) -> Self {
        Self { inner, level }
    }

    /// 绑定的级别
    pub fn level(&self) -> Level {
        self.level
    }
}

impl<W: LevelWrite> LevelWrite for LevelFilterWriter<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        if level == self.level {
            return self.inner.write_level(level, buf);
        }

        Ok(buf.len())
    }
}

/// 扇出写入器
///
/// 每条记录都会交给所有子写入器。某个子写入器失败时继续写其余的，
/// 最后返回遇到的第一个错误。
#[derive(Default)]
pub struct MultiLevelWriter {
    writers: Vec<Box<dyn LevelWrite>>,
}

impl MultiLevelWriter {
    pub fn new(writers: Vec<Box<dyn LevelWrite>>) -> Self {
        Self { writers }
    }

    pub fn push(&mut self, writer: impl LevelWrite + 'static) {
        self.writers.push(Box::new(writer));
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    fn fan_out<F>(&self, buf: &[u8], mut write: F) -> io::Result<usize>
    where
        F: FnMut(&dyn LevelWrite) -> io::Result<usize>,
    {
        let mut first_error = None;

        for writer in &self.writers {
            match write(writer.as_ref()) {
                Ok(n) if n != buf.len() && first_error.is_none() => {
                    first_error = Some(io::Error::from(io::ErrorKind::WriteZero));
                }
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(buf.len()),
        }
    }
}

impl LevelWrite for MultiLevelWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.fan_out(buf, |w| w.write(buf))
    }

    fn write_level(&self, level: Level, buf: &[u8]) -> io::Result<usize> {
        self.fan_out(buf, |w| w.write_level(level, buf))
    }
}

impl std::fmt::Debug for MultiLevelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLevelWriter")
            .field("writers", &self.writers.len())
            .finish()
    }
}
