//! 同步配置模块

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// 同步配置项：一对本地目录 <-> 远程目录，以及启用的方向
///
/// 设置文件中缺失的字段取默认值（空字符串 / 0 / false），
/// 所以不完整的配置项能正常解析，只是什么都不做。
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncProfile {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub remote_dir: String,
    pub local_dir: String,
    /// 推送：本地 -> 远程
    #[serde(rename = "SyncToRemote")]
    pub push: bool,
    /// 拉取：远程 -> 本地
    #[serde(rename = "SyncToLocal")]
    pub pull: bool,
}

// 密码不能出现在日志里
impl fmt::Debug for SyncProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("remote_dir", &self.remote_dir)
            .field("local_dir", &self.local_dir)
            .field("push", &self.push)
            .field("pull", &self.pull)
            .finish()
    }
}

/// 按名称索引的配置项集合，保持设置文件中的顺序
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    entries: Vec<(String, SyncProfile)>,
}

impl ProfileSet {
    /// 从 JSON 设置文件加载
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ParseFailure::Json(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::NotAMapping => ConfigError::NotAMapping {
                path: path.to_path_buf(),
            },
        })
    }

    fn parse(content: &str) -> Result<Self, ParseFailure> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(ParseFailure::Json)?;
        let serde_json::Value::Object(map) = value else {
            return Err(ParseFailure::NotAMapping);
        };

        let entries = map
            .into_iter()
            .map(|(name, raw)| {
                serde_json::from_value::<SyncProfile>(raw)
                    .map(|profile| (name, profile))
                    .map_err(ParseFailure::Json)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SyncProfile> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, profile)| profile)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    NotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_profile() {
        let json = r#"{
            "nas": {
                "Host": "10.0.0.2",
                "Port": 22,
                "Username": "me",
                "Password": "secret",
                "RemoteDir": "/data/photos",
                "LocalDir": "C:/Photos",
                "SyncToRemote": true,
                "SyncToLocal": false
            }
        }"#;

        let set = ProfileSet::parse(json).unwrap();
        let nas = set.get("nas").unwrap();
        assert_eq!(nas.host, "10.0.0.2");
        assert_eq!(nas.port, 22);
        assert_eq!(nas.remote_dir, "/data/photos");
        assert!(nas.push);
        assert!(!nas.pull);
    }

    #[test]
    fn test_missing_fields_default() {
        let set = ProfileSet::parse(r#"{ "empty": {}, "half": { "Host": "h" } }"#)
            .unwrap();
        assert_eq!(set.get("empty"), Some(&SyncProfile::default()));

        let half = set.get("half").unwrap();
        assert_eq!(half.host, "h");
        assert_eq!(half.port, 0);
        assert!(!half.push && !half.pull);
    }

    #[test]
    fn test_keeps_file_order() {
        let set = ProfileSet::parse(r#"{ "zeta": {}, "alpha": {}, "mid": {} }"#)
            .unwrap();
        assert_eq!(set.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_rejects_non_mapping() {
        assert!(matches!(
            ProfileSet::parse("[1, 2, 3]"),
            Err(ParseFailure::NotAMapping)
        ));
        assert!(matches!(
            ProfileSet::parse("not json"),
            Err(ParseFailure::Json(_))
        ));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProfileSet::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_debug_hides_password() {
        let profile = SyncProfile {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", profile).contains("hunter2"));
    }
}
