// 该文件是 Qiandao （签到） 项目的一部分。
// src/session.rs - 推理会话
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::frame::{InputTensor, OutputTensor};

/// 推理会话抽象。
///
/// 会话句柄持有底层推理引擎的原生资源，在 Drop 时释放，
/// 不释放即泄漏引擎资源。infer 以 &self 调用；只有当底层引擎
/// 允许并发推理时，同一会话才可以跨线程共享，否则由调用方串行化。
/// 后处理管线不依赖具体引擎，任何后端实现该 trait 即可接入。
pub trait InferSession {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 执行一次推理。输入形状 [1, 3, S, S]，输出形状 [1, R, D]，
  /// 见 frame 模块的张量约定。
  fn infer(&self, input: &InputTensor) -> Result<OutputTensor, Self::Error>;
}

#[cfg(feature = "replay_session")]
mod replay;
#[cfg(feature = "replay_session")]
pub use self::replay::{ReplaySession, ReplaySessionError};
