// 租户 AI 配置
// 固定结构的配置记录，以及三个订阅等级的默认值

use serde::{Deserialize, Serialize};

use ai_access_common::AccessFeatureKey;

use super::types::{ConfigSource, PlanTier, UNLIMITED};

/// 功能配置段的统一视图
pub trait FeatureSection: Sync {
    /// 该功能是否开通
    fn enabled(&self) -> bool;

    /// 每月次数上限，-1 表示不限量
    fn monthly_limit(&self) -> i64;

    /// 允许的操作列表；None 表示该功能不区分操作
    fn allowed_actions(&self) -> Option<&[String]> {
        None
    }
}

/// 租户的最终 AI 配置
///
/// 构造后不再修改；新的解析结果总是产生新实例。
/// `plan` 与 `source` 不参与序列化，因此也无法被覆盖项修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAiConfig {
    #[serde(skip)]
    pub plan: PlanTier,
    #[serde(skip)]
    pub source: ConfigSource,
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub streaming: bool,
    pub student_coaching: StudentCoachingConfig,
    pub project_scoping: ProjectScopingConfig,
    pub portfolio_intelligence: PortfolioIntelligenceConfig,
    pub talent_insights: TalentInsightsConfig,
    pub institutional_analytics: InstitutionalAnalyticsConfig,
}

/// 学生辅导
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCoachingConfig {
    pub enabled: bool,
    pub interactions_per_student_per_month: i64,
    pub allowed_quick_actions: Vec<String>,
    pub conversation_memory: bool,
    pub max_turns_per_session: u32,
}

/// 企业项目范围界定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScopingConfig {
    pub enabled: bool,
    pub scopings_per_month: i64,
    pub allowed_actions: Vec<String>,
    pub skill_suggestions: bool,
}

/// 学生作品集分析
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioIntelligenceConfig {
    pub enabled: bool,
    pub analyses_per_student_per_month: i64,
    pub allowed_actions: Vec<String>,
    pub employer_visibility: bool,
}

/// 企业人才洞察
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentInsightsConfig {
    pub enabled: bool,
    pub queries_per_month: i64,
    pub candidate_comparison: bool,
    pub max_candidates_per_query: u32,
}

/// 院校分析
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionalAnalyticsConfig {
    pub enabled: bool,
    pub reports_per_month: i64,
    pub cohort_benchmarking: bool,
    pub data_export: bool,
}

impl FeatureSection for StudentCoachingConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn monthly_limit(&self) -> i64 {
        self.interactions_per_student_per_month
    }

    fn allowed_actions(&self) -> Option<&[String]> {
        Some(&self.allowed_quick_actions)
    }
}

impl FeatureSection for ProjectScopingConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn monthly_limit(&self) -> i64 {
        self.scopings_per_month
    }

    fn allowed_actions(&self) -> Option<&[String]> {
        Some(&self.allowed_actions)
    }
}

impl FeatureSection for PortfolioIntelligenceConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn monthly_limit(&self) -> i64 {
        self.analyses_per_student_per_month
    }

    fn allowed_actions(&self) -> Option<&[String]> {
        Some(&self.allowed_actions)
    }
}

impl FeatureSection for TalentInsightsConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn monthly_limit(&self) -> i64 {
        self.queries_per_month
    }
}

impl FeatureSection for InstitutionalAnalyticsConfig {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn monthly_limit(&self) -> i64 {
        self.reports_per_month
    }
}

fn actions(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl TenantAiConfig {
    /// 功能标识对应的配置段
    pub fn section(&self, feature: AccessFeatureKey) -> &dyn FeatureSection {
        match feature {
            AccessFeatureKey::StudentCoaching => &self.student_coaching,
            AccessFeatureKey::ProjectScoping => &self.project_scoping,
            AccessFeatureKey::PortfolioIntelligence => &self.portfolio_intelligence,
            AccessFeatureKey::TalentInsights => &self.talent_insights,
            AccessFeatureKey::InstitutionalAnalytics => &self.institutional_analytics,
        }
    }

    /// 等级默认配置
    pub fn for_plan(plan: PlanTier) -> Self {
        match plan {
            PlanTier::Starter => Self::starter(),
            PlanTier::Professional => Self::professional(),
            PlanTier::Enterprise => Self::enterprise(),
        }
    }

    /// 替换来源信息，返回新实例
    pub fn with_origin(mut self, plan: PlanTier, source: ConfigSource) -> Self {
        self.plan = plan;
        self.source = source;
        self
    }

    fn starter() -> Self {
        Self {
            plan: PlanTier::Starter,
            source: ConfigSource::Fallback,
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            streaming: false,
            student_coaching: StudentCoachingConfig {
                enabled: true,
                interactions_per_student_per_month: 10,
                allowed_quick_actions: actions(&["resume_review", "career_advice", "general"]),
                conversation_memory: false,
                max_turns_per_session: 10,
            },
            project_scoping: ProjectScopingConfig {
                enabled: true,
                scopings_per_month: 5,
                allowed_actions: actions(&["generate_scope"]),
                skill_suggestions: false,
            },
            portfolio_intelligence: PortfolioIntelligenceConfig {
                enabled: false,
                analyses_per_student_per_month: 0,
                allowed_actions: Vec::new(),
                employer_visibility: false,
            },
            talent_insights: TalentInsightsConfig {
                enabled: false,
                queries_per_month: 0,
                candidate_comparison: false,
                max_candidates_per_query: 0,
            },
            institutional_analytics: InstitutionalAnalyticsConfig {
                enabled: false,
                reports_per_month: 0,
                cohort_benchmarking: false,
                data_export: false,
            },
        }
    }

    fn professional() -> Self {
        Self {
            plan: PlanTier::Professional,
            source: ConfigSource::Fallback,
            enabled: true,
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            streaming: true,
            student_coaching: StudentCoachingConfig {
                enabled: true,
                interactions_per_student_per_month: 50,
                allowed_quick_actions: actions(&[
                    "resume_review",
                    "career_advice",
                    "general",
                    "interview_prep",
                    "skill_gap_analysis",
                ]),
                conversation_memory: true,
                max_turns_per_session: 25,
            },
            project_scoping: ProjectScopingConfig {
                enabled: true,
                scopings_per_month: 25,
                allowed_actions: actions(&["generate_scope", "refine_scope", "suggest_skills"]),
                skill_suggestions: true,
            },
            portfolio_intelligence: PortfolioIntelligenceConfig {
                enabled: true,
                analyses_per_student_per_month: 20,
                allowed_actions: actions(&["portfolio_review", "project_highlights"]),
                employer_visibility: false,
            },
            talent_insights: TalentInsightsConfig {
                enabled: true,
                queries_per_month: 100,
                candidate_comparison: false,
                max_candidates_per_query: 10,
            },
            institutional_analytics: InstitutionalAnalyticsConfig {
                enabled: false,
                reports_per_month: 0,
                cohort_benchmarking: false,
                data_export: false,
            },
        }
    }

    fn enterprise() -> Self {
        Self {
            plan: PlanTier::Enterprise,
            source: ConfigSource::Fallback,
            enabled: true,
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            streaming: true,
            student_coaching: StudentCoachingConfig {
                enabled: true,
                interactions_per_student_per_month: UNLIMITED,
                allowed_quick_actions: actions(&[
                    "resume_review",
                    "career_advice",
                    "general",
                    "interview_prep",
                    "skill_gap_analysis",
                    "mock_interview",
                ]),
                conversation_memory: true,
                max_turns_per_session: 50,
            },
            project_scoping: ProjectScopingConfig {
                enabled: true,
                scopings_per_month: UNLIMITED,
                allowed_actions: actions(&[
                    "generate_scope",
                    "refine_scope",
                    "suggest_skills",
                    "estimate_timeline",
                ]),
                skill_suggestions: true,
            },
            portfolio_intelligence: PortfolioIntelligenceConfig {
                enabled: true,
                analyses_per_student_per_month: UNLIMITED,
                allowed_actions: actions(&[
                    "portfolio_review",
                    "project_highlights",
                    "employer_match_summary",
                ]),
                employer_visibility: true,
            },
            talent_insights: TalentInsightsConfig {
                enabled: true,
                queries_per_month: UNLIMITED,
                candidate_comparison: true,
                max_candidates_per_query: 50,
            },
            institutional_analytics: InstitutionalAnalyticsConfig {
                enabled: true,
                reports_per_month: UNLIMITED,
                cohort_benchmarking: true,
                data_export: true,
            },
        }
    }
}
