//! 尚未实现的约束类型
//!
//! 保留完整的配置与脏标记生命周期，但创建关节总是失败，
//! 不会用其它关节凑合出物理效果。

use std::convert::Infallible;
use std::fmt;

use super::{Constraint, ConstraintCore, ConstraintKind};
use crate::backend::JointBackend;
use crate::{ConstraintError, Result};

/// 占位约束的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// 线性弹簧
    LinearSpring,
    /// 角度弹簧
    AngleSpring,
    /// 线性 + 角度弹簧
    LinearAngleSpring,
    Fixed,
    Planar,
    /// 限制在盒子范围内移动
    Box,
    Hinge,
    Cardan,
    Ragdoll,
    WheelSuspension,
}

impl PlaceholderKind {
    pub fn name(self) -> &'static str {
        match self {
            PlaceholderKind::LinearSpring => "LinearSpringConstraint",
            PlaceholderKind::AngleSpring => "AngleSpringConstraint",
            PlaceholderKind::LinearAngleSpring => "LinearAngleSpringConstraint",
            PlaceholderKind::Fixed => "FixedConstraint",
            PlaceholderKind::Planar => "PlanarConstraint",
            PlaceholderKind::Box => "BoxConstraint",
            PlaceholderKind::Hinge => "HingeConstraint",
            PlaceholderKind::Cardan => "CardanConstraint",
            PlaceholderKind::Ragdoll => "RagdollConstraint",
            PlaceholderKind::WheelSuspension => "WheelSuspensionConstraint",
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 占位约束参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
}

impl Placeholder {
    pub fn new(kind: PlaceholderKind) -> Self {
        Self { kind }
    }

    pub fn linear_spring() -> Self {
        Self::new(PlaceholderKind::LinearSpring)
    }

    pub fn angle_spring() -> Self {
        Self::new(PlaceholderKind::AngleSpring)
    }

    pub fn linear_angle_spring() -> Self {
        Self::new(PlaceholderKind::LinearAngleSpring)
    }

    pub fn fixed() -> Self {
        Self::new(PlaceholderKind::Fixed)
    }

    pub fn planar() -> Self {
        Self::new(PlaceholderKind::Planar)
    }

    pub fn boxed() -> Self {
        Self::new(PlaceholderKind::Box)
    }

    pub fn hinge() -> Self {
        Self::new(PlaceholderKind::Hinge)
    }

    pub fn cardan() -> Self {
        Self::new(PlaceholderKind::Cardan)
    }

    pub fn ragdoll() -> Self {
        Self::new(PlaceholderKind::Ragdoll)
    }

    pub fn wheel_suspension() -> Self {
        Self::new(PlaceholderKind::WheelSuspension)
    }
}

impl ConstraintKind for Placeholder {
    type Plan = Infallible;

    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn plan<H: Copy>(&self, _core: &ConstraintCore<H>) -> Result<Infallible> {
        Err(ConstraintError::Unimplemented(self.kind))
    }

    fn build<B: JointBackend>(&self, plan: Infallible, _backend: &mut B) -> Result<B::Handle> {
        match plan {}
    }
}

pub type PlaceholderConstraint<H = rapier3d::prelude::ImpulseJointHandle> = Constraint<Placeholder, H>;
