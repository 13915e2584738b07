//! 球窝约束
//!
//! 两个刚体共享一个世界空间锚点，分别换算到各自质心局部空间。

use std::fmt;

use glam::{Mat4, Vec3};
use rapier3d::prelude::RigidBodyHandle;

use super::{Constraint, ConstraintCore, ConstraintKind};
use crate::backend::JointBackend;
use crate::body::{resolve_center_of_mass, BodyRef, BodySlot};
use crate::Result;

/// 球窝约束参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BallAndSocket {
    /// 世界空间锚点（配置时刻）
    pub point: Vec3,
}

/// 点对点关节的创建参数（锚点位于刚体质心局部空间）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointToPointPlan {
    body_a: RigidBodyHandle,
    pivot_a: Vec3,
    /// 单刚体时为 None
    b: Option<(RigidBodyHandle, Vec3)>,
}

impl PointToPointPlan {
    pub fn pivot_a(&self) -> Vec3 {
        self.pivot_a
    }

    pub fn pivot_b(&self) -> Option<Vec3> {
        self.b.map(|(_, pivot_b)| pivot_b)
    }
}

impl BallAndSocket {
    pub fn new(point: Vec3) -> Self {
        Self { point }
    }

    /// 世界锚点 → 刚体质心局部空间：(frame · T(com))⁻¹ · point
    fn local_pivot(&self, body: &BodyRef, frame: Mat4, slot: BodySlot) -> Result<Vec3> {
        let com = resolve_center_of_mass(body, slot)?;
        let to_local = (frame * Mat4::from_translation(com)).inverse();
        Ok(to_local.transform_point3(self.point))
    }
}

impl ConstraintKind for BallAndSocket {
    type Plan = PointToPointPlan;

    fn name(&self) -> &'static str {
        "BallAndSocketConstraint"
    }

    fn plan<H: Copy>(&self, core: &ConstraintCore<H>) -> Result<PointToPointPlan> {
        let body_a = core.require_body_a()?;
        let pivot_a = self.local_pivot(body_a, core.frame_a(), BodySlot::A)?;

        // 没有刚体 B 时不计算 B 端锚点，也不替换任何默认值
        let b = match core.body_b() {
            Some(body_b) => Some((body_b.handle(), self.local_pivot(body_b, core.frame_b(), BodySlot::B)?)),
            None => None,
        };

        Ok(PointToPointPlan {
            body_a: body_a.handle(),
            pivot_a,
            b,
        })
    }

    fn build<B: JointBackend>(&self, plan: PointToPointPlan, backend: &mut B) -> Result<B::Handle> {
        match plan.b {
            Some((body_b, pivot_b)) => backend.create_point_to_point(plan.body_a, body_b, plan.pivot_a, pivot_b),
            None => backend.create_point_to_point_single(plan.body_a, plan.pivot_a),
        }
    }
}

pub type BallAndSocketConstraint<H = rapier3d::prelude::ImpulseJointHandle> = Constraint<BallAndSocket, H>;

impl<H: Copy + fmt::Debug> Constraint<BallAndSocket, H> {
    /// 单刚体球窝约束（另一端为世界）
    pub fn single_body(body_a: BodyRef, frame_a: Mat4, point: Vec3) -> Self {
        Self::from_parts(Some(body_a), frame_a, None, Mat4::IDENTITY, BallAndSocket::new(point))
    }

    pub fn two_body(body_a: BodyRef, frame_a: Mat4, body_b: BodyRef, frame_b: Mat4, point: Vec3) -> Self {
        Self::from_parts(Some(body_a), frame_a, Some(body_b), frame_b, BallAndSocket::new(point))
    }

    pub fn point(&self) -> Vec3 {
        self.kind.point
    }

    /// 修改锚点，需要重建关节
    pub fn set_point(&mut self, point: Vec3) {
        self.kind_mut().point = point;
    }

    /// 以原生点对点关节访问；关节无效时为 None
    pub fn as_native_point_to_point<'b, B>(&self, backend: &'b B) -> Option<&'b B::Joint>
    where
        B: JointBackend<Handle = H>,
    {
        self.core.live_joint().and_then(|handle| backend.native(handle))
    }
}
