//! 约束配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::f32::consts::PI;
use std::sync::RwLock;

/// 约束配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct ConstraintConfig {
    // ========== 关节 ==========
    /// 关节连接的两个刚体之间是否允许碰撞，默认 false
    pub contacts_enabled: bool,
    /// 插入关节时是否唤醒刚体，默认 true
    pub wake_up: bool,

    // ========== 滑动关节 ==========
    /// 滑动关节创建时的默认角度限制（Bullet btSliderConstraint 默认 [0, 0]，即锁死扭转）
    pub slider_angular_limit: [f32; 2],
    /// 扭转滑动关节放开后的角度范围（±该值），默认 π
    pub twist_angular_limit: f32,
    /// 滑动轴的最小长度，低于此值视为退化轴，默认 1e-6
    pub min_axis_length: f32,

    // ========== 调试 ==========
    /// 是否输出关节创建日志，默认 false
    pub debug_log: bool,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            // ====== 关节 ======
            // 与 MMD 关节一致：被连接的刚体之间不产生碰撞
            contacts_enabled: false,
            wake_up: true,

            // ====== 滑动关节 ======
            slider_angular_limit: [0.0, 0.0],
            // 扭转滑动关节：完全放开绕滑动轴的旋转
            twist_angular_limit: PI,
            min_axis_length: 1e-6,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static CONSTRAINT_CONFIG: Lazy<RwLock<ConstraintConfig>> = Lazy::new(|| {
    RwLock::new(ConstraintConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> ConstraintConfig {
    CONSTRAINT_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: ConstraintConfig) {
    *CONSTRAINT_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *CONSTRAINT_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = ConstraintConfig::default();
}
