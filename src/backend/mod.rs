//! 物理引擎关节后端
//!
//! 约束层只负责计算局部帧，真正的关节对象由后端创建并持有。
//!
//! ## 关节对应关系
//! | Bullet3 (C++) | Rapier (Rust) |
//! |---------------|---------------|
//! | btSliderConstraint(rbA, rbB, frameA, frameB, false) | GenericJoint（仅 LinX/AngX 自由） |
//! | btSliderConstraint(rbA, frameA, true) | 同上，另一端为固定地面刚体 |
//! | btPoint2PointConstraint(rbA, rbB, pivotA, pivotB) | SphericalJoint |
//! | btPoint2PointConstraint(rbA, pivotA) | SphericalJoint，另一端为固定地面刚体 |

mod rapier;
mod recording;

pub use rapier::RapierBackend;
pub use recording::{JointCall, RecordedJoint, RecordedJointId, RecordingBackend};

use std::fmt::Debug;

use glam::{Mat4, Vec3};
use rapier3d::prelude::RigidBodyHandle;

use crate::Result;

/// 关节后端接口
///
/// 每种关节提供双刚体与单刚体两个构造入口。
/// 帧和锚点均已在刚体质心局部空间中计算好。
pub trait JointBackend {
    /// 关节句柄（不拥有，拷贝廉价）
    type Handle: Copy + Eq + Debug;
    /// 原生关节类型
    type Joint;

    /// 双刚体滑动关节，滑动轴为关节帧的局部 X 轴
    fn create_slider(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        frame_a: Mat4,
        frame_b: Mat4,
        use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle>;

    /// 单刚体滑动关节（另一端为世界）
    fn create_slider_single(
        &mut self,
        body_a: RigidBodyHandle,
        frame_a: Mat4,
        use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle>;

    /// 双刚体点对点（球窝）关节
    fn create_point_to_point(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> Result<Self::Handle>;

    /// 单刚体点对点关节（另一端为世界）
    fn create_point_to_point_single(
        &mut self,
        body_a: RigidBodyHandle,
        pivot_a: Vec3,
    ) -> Result<Self::Handle>;

    /// 设置沿滑动轴的线性限制，句柄无效时返回 false
    fn set_linear_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool;

    /// 设置绕滑动轴的角度限制，句柄无效时返回 false
    fn set_angular_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool;

    fn linear_limit(&self, handle: Self::Handle) -> Option<(f32, f32)>;

    fn angular_limit(&self, handle: Self::Handle) -> Option<(f32, f32)>;

    /// 访问原生关节
    fn native(&self, handle: Self::Handle) -> Option<&Self::Joint>;

    /// 从引擎中移除关节，句柄无效时返回 false
    fn remove_joint(&mut self, handle: Self::Handle) -> bool;
}
