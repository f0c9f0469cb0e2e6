// 该文件是 Qiandao （签到） 项目的一部分。
// src/model/labels.rs - 类别表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

/// 默认的证件字段类别表，与训练元数据一致
const DEFAULT_LABELS: [&str; 4] = ["Date_of_Birth", "First_Name", "ID_Number", "Last_Name"];

/// 类别索引到名称的只读有序映射，初始化时加载一次。
/// 表长即类别数 C，解码按 4+C 行约定读取输出张量。
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl Default for LabelTable {
  fn default() -> Self {
    Self {
      names: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl LabelTable {
  pub fn new(names: Vec<String>) -> Self {
    Self {
      names: names.into_boxed_slice(),
    }
  }

  /// 从模型元数据文件加载类别表。
  /// 文件包含 `names:` 段，其下逐行 `索引: 名称`；
  /// 文件缺失或解析失败时退回默认表，不向调用方报错。
  pub fn load(path: &Path) -> Self {
    match std::fs::read_to_string(path) {
      Ok(content) => match parse_names_section(&content) {
        Some(names) => {
          debug!("从元数据加载 {} 个类别: {:?}", names.len(), names);
          Self::new(names)
        }
        None => {
          warn!(
            "元数据中没有有效的 names 段，使用默认类别表: {}",
            path.display()
          );
          Self::default()
        }
      },
      Err(e) => {
        warn!("无法读取元数据文件 {}: {}，使用默认类别表", path.display(), e);
        Self::default()
      }
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 解析类别名称；索引越界时合成 `Class_<索引>` 而不是报错
  pub fn resolve(&self, class_id: u32) -> String {
    self
      .names
      .get(class_id as usize)
      .cloned()
      .unwrap_or_else(|| format!("Class_{}", class_id))
  }
}

/// 解析 `names:` 段。进入该段后，遇到第一个非缩进且不匹配
/// `索引: 名称` 的行即结束；缺失的索引以 `Unknown_<索引>` 回填。
fn parse_names_section(content: &str) -> Option<Vec<String>> {
  let mut entries: HashMap<usize, String> = HashMap::new();
  let mut in_names = false;

  for line in content.lines() {
    let trimmed = line.trim();
    if trimmed == "names:" {
      in_names = true;
      continue;
    }
    if !in_names {
      continue;
    }

    if let Some((index, name)) = parse_name_entry(trimmed) {
      entries.insert(index, name);
    } else if !trimmed.is_empty() && !line.starts_with(char::is_whitespace) {
      break;
    }
  }

  if entries.is_empty() {
    return None;
  }

  let count = entries.len();
  Some(
    (0..count)
      .map(|i| {
        entries
          .remove(&i)
          .unwrap_or_else(|| format!("Unknown_{}", i))
      })
      .collect(),
  )
}

fn parse_name_entry(line: &str) -> Option<(usize, String)> {
  let (index, name) = line.split_once(':')?;
  let index = index.trim().parse::<usize>().ok()?;
  let name = name.trim();
  if name.is_empty() {
    return None;
  }
  Some((index, name.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_names_section() {
    let content = "task: detect\nnames:\n  0: Date_of_Birth\n  1: First_Name\n  2: ID_Number\n";
    let names = parse_names_section(content).unwrap();
    assert_eq!(names, vec!["Date_of_Birth", "First_Name", "ID_Number"]);
  }

  #[test]
  fn stops_at_first_unindented_line() {
    let content = "names:\n  0: First\n  1: Second\nversion: 2\n  2: Third\n";
    let names = parse_names_section(content).unwrap();
    assert_eq!(names, vec!["First", "Second"]);
  }

  #[test]
  fn backfills_missing_indices() {
    let content = "names:\n  0: First\n  2: Third\n";
    let names = parse_names_section(content).unwrap();
    assert_eq!(names, vec!["First", "Unknown_1"]);
  }

  #[test]
  fn no_names_section_yields_none() {
    assert!(parse_names_section("task: detect\nversion: 2\n").is_none());
    assert!(parse_names_section("").is_none());
  }

  #[test]
  fn missing_file_falls_back_to_default() {
    let table = LabelTable::load(Path::new("/nonexistent/qiandao/metadata.yaml"));
    assert_eq!(table.len(), 4);
    assert_eq!(table.resolve(0), "Date_of_Birth");
    assert_eq!(table.resolve(3), "Last_Name");
  }

  #[test]
  fn out_of_range_synthesizes_class_name() {
    let table = LabelTable::default();
    assert_eq!(table.resolve(7), "Class_7");
  }
}
