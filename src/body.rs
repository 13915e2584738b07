//! 刚体引用与运动状态
//!
//! 约束不拥有刚体，只持有物理引擎中的句柄。
//! 质心偏移来自运动状态：引擎里刚体的原点是质心，
//! 场景图里的参考原点是图形原点，两者之差必须在关节帧里扣除。

use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;

use crate::{ConstraintError, Result};

/// 运动状态能力接口
///
/// 返回 None 表示该运动状态不提供质心偏移（不是本层能识别的类型）。
pub trait MotionState {
    fn center_of_mass(&self) -> Option<Vec3>;
}

/// 带质心偏移的运动状态
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffsetMotionState {
    /// 图形原点到质心的偏移
    pub center_of_mass: Vec3,
}

impl OffsetMotionState {
    pub fn new(center_of_mass: Vec3) -> Self {
        Self { center_of_mass }
    }
}

impl MotionState for OffsetMotionState {
    fn center_of_mass(&self) -> Option<Vec3> {
        Some(self.center_of_mass)
    }
}

/// 约束中的刚体位置（A 或 B），用于错误信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySlot {
    A,
    B,
}

impl fmt::Display for BodySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySlot::A => f.write_str("A"),
            BodySlot::B => f.write_str("B"),
        }
    }
}

/// 刚体引用（不拥有）
///
/// 句柄指向物理引擎中的刚体，运动状态由场景侧共享。
///
/// 使用 [`crate::RapierBackend`] 时，`handle` 指向的刚体应位于质心位姿
/// `frame · T(center_of_mass)`，关节帧才会落在正确位置。
#[derive(Clone)]
pub struct BodyRef {
    handle: RigidBodyHandle,
    motion_state: Option<Rc<dyn MotionState>>,
}

impl BodyRef {
    pub fn new(handle: RigidBodyHandle, motion_state: Rc<dyn MotionState>) -> Self {
        Self {
            handle,
            motion_state: Some(motion_state),
        }
    }

    /// 没有运动状态的刚体（无法参与需要质心的关节计算）
    pub fn without_motion_state(handle: RigidBodyHandle) -> Self {
        Self {
            handle,
            motion_state: None,
        }
    }

    /// 使用 [`OffsetMotionState`] 的便捷构造
    pub fn with_center_of_mass(handle: RigidBodyHandle, center_of_mass: Vec3) -> Self {
        Self::new(handle, Rc::new(OffsetMotionState::new(center_of_mass)))
    }

    #[inline]
    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn motion_state(&self) -> Option<&Rc<dyn MotionState>> {
        self.motion_state.as_ref()
    }

    pub fn set_motion_state(&mut self, motion_state: Option<Rc<dyn MotionState>>) {
        self.motion_state = motion_state;
    }
}

impl fmt::Debug for BodyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyRef")
            .field("handle", &self.handle)
            .field("center_of_mass", &self.motion_state.as_ref().and_then(|m| m.center_of_mass()))
            .finish()
    }
}

/// 解析刚体的质心偏移
///
/// 运动状态缺失或不提供质心时返回 `InvalidMotionState`。
pub fn resolve_center_of_mass(body: &BodyRef, slot: BodySlot) -> Result<Vec3> {
    body.motion_state
        .as_ref()
        .and_then(|state| state.center_of_mass())
        .ok_or(ConstraintError::InvalidMotionState(slot))
}
