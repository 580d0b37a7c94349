// 配置验证器

use crate::config::LoggerConfig;
use fanlog_common::CommonError;

/// 单个滚动文件允许的最大尺寸（MB）
const MAX_ROTATION_SIZE_MB: u64 = 1024 * 1024;

/// 滚动文件允许的最长保留天数
const MAX_AGE_DAYS: u64 = 100 * 365;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证完整配置，返回全部错误
    pub fn validate_all(config: &LoggerConfig) -> Result<(), Vec<CommonError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_file_output(config) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_rotation(config) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_service_name(config) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 会创建文件输出时路径不能为空
    ///
    /// 无法识别的最低级别不算错误，只是不创建文件输出。
    pub fn validate_file_output(config: &LoggerConfig) -> Result<(), CommonError> {
        if !config.file_levels().is_empty() && config.path.trim().is_empty() {
            return Err(CommonError::validation("path", "启用文件日志时路径不能为空"));
        }

        Ok(())
    }

    /// 验证滚动参数
    pub fn validate_rotation(config: &LoggerConfig) -> Result<(), CommonError> {
        if config.rotation_max_size_mb == 0 {
            return Err(CommonError::validation(
                "rotation_max_size_mb",
                "滚动大小必须大于 0",
            ));
        }

        if config.rotation_max_size_mb > MAX_ROTATION_SIZE_MB {
            return Err(CommonError::validation(
                "rotation_max_size_mb",
                format!("滚动大小不能超过 {} MB", MAX_ROTATION_SIZE_MB),
            ));
        }

        if config.max_age_days > MAX_AGE_DAYS {
            return Err(CommonError::validation(
                "max_age_days",
                format!("保留天数不能超过 {} 天", MAX_AGE_DAYS),
            ));
        }

        Ok(())
    }

    /// 服务名会成为每条记录的字段值
    pub fn validate_service_name(config: &LoggerConfig) -> Result<(), CommonError> {
        if config.service_name.trim().is_empty() {
            return Err(CommonError::validation("service_name", "服务名不能为空"));
        }

        Ok(())
    }
}
