//! Constraint Rig - 刚体约束的惰性配置层
//!
//! 位于场景图变换（世界空间参考矩阵）与物理引擎关节之间：
//! - 根据两个刚体的参考变换和质心偏移计算关节局部帧
//! - 第一次需要时才创建关节，之后缓存
//! - 脏标记区分"原地更新参数"与"完整重建关节"
//!
//! 关节本体由物理引擎持有（见 [`backend::JointBackend`]），
//! 约束只保存不拥有的句柄，释放由上层负责。

pub mod backend;
pub mod body;
pub mod config;
pub mod constraint;
pub mod math;

pub use backend::{JointBackend, RapierBackend, RecordingBackend};
pub use body::{BodyRef, BodySlot, MotionState, OffsetMotionState};
pub use config::{ConstraintConfig, get_config, set_config, reset_config};
pub use constraint::{
    AnyConstraint, BallAndSocket, BallAndSocketConstraint, Constraint, ConstraintCore,
    ConstraintKind, Placeholder, PlaceholderConstraint, PlaceholderKind, PointToPointPlan,
    SlideParams, Slider, SliderConstraint, SliderPlan, TwistSlider, TwistSliderConstraint,
};

use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("rigid body A is not set")]
    MissingBodyA,

    #[error("rigid body {0} has no usable motion state")]
    InvalidMotionState(BodySlot),

    #[error("slide axis {0} is degenerate")]
    DegenerateAxis(Vec3),

    #[error("{0} is not implemented")]
    Unimplemented(PlaceholderKind),

    #[error("rigid body {0:?} is unknown to the physics backend")]
    UnknownBody(RigidBodyHandle),
}

impl ConstraintError {
    /// 按错误类型输出诊断日志（缺少刚体 A 只是 debug 级别）
    pub(crate) fn log(&self, kind_name: &str) {
        match self {
            ConstraintError::MissingBodyA => {
                log::debug!("[Constraint] {}: create_joint 跳过，{}", kind_name, self);
            }
            _ => {
                log::warn!("[Constraint] {}: 关节创建失败，{}", kind_name, self);
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConstraintError>;

/// 测试用日志初始化，可重复调用（`cargo test -- --nocapture` 查看输出）
#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
