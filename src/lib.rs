use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;

use crate::{
    config::Settings,
    database::DatabasePool,
    graphql::{build_schema, AurumSchema, GraphqlServices},
    middleware::IpRateLimiter,
    repositories::{
        AlignmentRepository, AnalyticsRepository, AreaRepository, InsightRepository,
        JournalRepository, NotificationRepository, PillarRepository, ProjectRepository,
        RecurringTaskRepository, SqlxAlignmentRepository, SqlxAnalyticsRepository,
        SqlxAreaRepository, SqlxInsightRepository, SqlxJournalRepository,
        SqlxNotificationRepository, SqlxPillarRepository, SqlxProjectRepository,
        SqlxRecurringTaskRepository, SqlxTaskRepository, SqlxUserRepository, TaskRepository,
        UserRepository,
    },
    services::{
        AlignmentService, AnalyticsService, AreaService, AuthService, BlackboardService,
        DashboardService, JournalService, MetricsService, NotificationService, PillarService,
        ProjectService, RecurringTaskService, Scheduler, TaskService, TodayService,
    },
};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db_pool: DatabasePool,
    pub auth_service: Arc<AuthService>,
    pub pillar_service: Arc<PillarService>,
    pub area_service: Arc<AreaService>,
    pub project_service: Arc<ProjectService>,
    pub task_service: Arc<TaskService>,
    pub recurring_task_service: Arc<RecurringTaskService>,
    pub notification_service: Arc<NotificationService>,
    pub journal_service: Arc<JournalService>,
    pub today_service: Arc<TodayService>,
    pub dashboard_service: Arc<DashboardService>,
    pub alignment_service: Arc<AlignmentService>,
    pub blackboard_service: Arc<BlackboardService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub metrics_service: Arc<MetricsService>,
    pub scheduler: Arc<Scheduler>,
    pub ip_rate_limiter: Arc<IpRateLimiter>,
    pub graphql_schema: AurumSchema,
    pub key: Key,
}

// Lets PrivateCookieJar find the cookie key
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl AppState {
    /// Connects to the database, runs migrations and wires every service.
    pub async fn new(config: Settings) -> Result<Self, crate::error::ApiError> {
        let db_pool = crate::database::create_connection_pool(&config.database_url).await?;
        Ok(Self::new_with_pool(config, db_pool))
    }

    /// Wire services over an existing pool. Background workers are not
    /// started here; see [`AppState::start_background_tasks`].
    pub fn new_with_pool(config: Settings, db_pool: DatabasePool) -> Self {
        let config = Arc::new(config);
        let key = Key::from(config.auth_secret.as_bytes());

        // Repositories
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(db_pool.clone()));
        let pillar_repo: Arc<dyn PillarRepository> =
            Arc::new(SqlxPillarRepository::new(db_pool.clone()));
        let area_repo: Arc<dyn AreaRepository> = Arc::new(SqlxAreaRepository::new(db_pool.clone()));
        let project_repo: Arc<dyn ProjectRepository> =
            Arc::new(SqlxProjectRepository::new(db_pool.clone()));
        let task_repo: Arc<dyn TaskRepository> = Arc::new(SqlxTaskRepository::new(db_pool.clone()));
        let journal_repo: Arc<dyn JournalRepository> =
            Arc::new(SqlxJournalRepository::new(db_pool.clone()));
        let insight_repo: Arc<dyn InsightRepository> =
            Arc::new(SqlxInsightRepository::new(db_pool.clone()));
        let analytics_repo: Arc<dyn AnalyticsRepository> =
            Arc::new(SqlxAnalyticsRepository::new(db_pool.clone()));
        let alignment_repo: Arc<dyn AlignmentRepository> =
            Arc::new(SqlxAlignmentRepository::new(db_pool.clone()));
        let recurring_repo: Arc<dyn RecurringTaskRepository> =
            Arc::new(SqlxRecurringTaskRepository::new(db_pool.clone()));
        let notification_repo: Arc<dyn NotificationRepository> =
            Arc::new(SqlxNotificationRepository::new(db_pool.clone()));

        // Services
        let auth_service = Arc::new(AuthService::new(config.clone(), user_repo.clone()));
        let alignment_service = Arc::new(AlignmentService::new(
            alignment_repo,
            config.alignment_default_monthly_goal,
        ));
        let pillar_service = Arc::new(PillarService::new(pillar_repo.clone(), area_repo.clone()));
        let area_service = Arc::new(AreaService::new(
            area_repo.clone(),
            pillar_repo.clone(),
            project_repo.clone(),
        ));
        let project_service = Arc::new(ProjectService::new(
            project_repo.clone(),
            area_repo.clone(),
            task_repo.clone(),
        ));
        let notification_service = Arc::new(NotificationService::new(
            notification_repo,
            task_repo.clone(),
            project_repo.clone(),
        ));
        let task_service = Arc::new(
            TaskService::new(
                task_repo.clone(),
                area_repo.clone(),
                project_service.clone(),
                alignment_service.clone(),
            )
            .with_notifications(notification_service.clone()),
        );
        let recurring_task_service = Arc::new(RecurringTaskService::new(
            recurring_repo,
            task_repo.clone(),
            project_service.clone(),
            task_service.clone(),
            notification_service.clone(),
        ));
        let journal_service = Arc::new(JournalService::new(journal_repo));
        let today_service = Arc::new(TodayService::new(
            task_repo.clone(),
            project_repo.clone(),
            area_repo.clone(),
            pillar_repo.clone(),
            task_service.clone(),
            config.today_weights(),
            config.today_default_top_n,
        ));
        let dashboard_service = Arc::new(DashboardService::new(
            user_repo,
            pillar_repo,
            area_repo,
            project_repo,
            task_repo,
        ));
        let blackboard_service = Arc::new(BlackboardService::new(insight_repo));
        let analytics_service = Arc::new(AnalyticsService::new(
            analytics_repo,
            config.analytics_default_days,
        ));
        let metrics_service = Arc::new(MetricsService::new());
        let scheduler = Arc::new(Scheduler::new());
        let ip_rate_limiter = Arc::new(IpRateLimiter::new(&config));

        let graphql_schema = build_schema(GraphqlServices {
            auth: auth_service.clone(),
            pillars: pillar_service.clone(),
            areas: area_service.clone(),
            projects: project_service.clone(),
            tasks: task_service.clone(),
            journal: journal_service.clone(),
            dashboard: dashboard_service.clone(),
        });

        Self {
            config,
            db_pool,
            auth_service,
            pillar_service,
            area_service,
            project_service,
            task_service,
            recurring_task_service,
            notification_service,
            journal_service,
            today_service,
            dashboard_service,
            alignment_service,
            blackboard_service,
            analytics_service,
            metrics_service,
            scheduler,
            ip_rate_limiter,
            graphql_schema,
            key,
        }
    }

    /// Start the blackboard worker, the insight expiry sweep, recurring task
    /// generation and the reminder sweep.
    pub async fn start_background_tasks(&self) {
        let interval =
            std::time::Duration::from_secs(self.config.blackboard_cleanup_interval_seconds);
        self.blackboard_service.start(interval).await;
        self.blackboard_service
            .subscribe(
                "insight-log",
                Default::default(),
                Arc::new(crate::services::LoggingSubscriber),
            )
            .await;

        let recurring = self.recurring_task_service.clone();
        self.scheduler.every(
            "recurring-task-generation",
            std::time::Duration::from_secs(self.config.recurring_generation_interval_seconds),
            move || {
                let recurring = recurring.clone();
                async move { recurring.run_due(chrono::Utc::now().date_naive()).await }
            },
        );

        let notifications = self.notification_service.clone();
        self.scheduler.every(
            "notification-sweep",
            std::time::Duration::from_secs(self.config.notification_sweep_interval_seconds),
            move || {
                let notifications = notifications.clone();
                async move { notifications.process_due(chrono::Utc::now()).await }
            },
        );
    }
}
