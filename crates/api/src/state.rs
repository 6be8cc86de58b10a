use agrimarket_config::Settings;
use agrimarket_services::{
    AuthService,
    dao::{
        analytics::AnalyticsDao, application::ApplicationDao, contract::ContractDao,
        invitation::InvitationDao, listing::ListingDao, order::OrderDao,
        schedule::ScheduleDao, user::UserDao,
    },
};
use mongodb::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub listings: Arc<ListingDao>,
    pub orders: Arc<OrderDao>,
    pub schedules: Arc<ScheduleDao>,
    pub applications: Arc<ApplicationDao>,
    pub contracts: Arc<ContractDao>,
    pub invitations: Arc<InvitationDao>,
    pub analytics: Arc<AnalyticsDao>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let listings = Arc::new(ListingDao::new(&db));
        let orders = Arc::new(OrderDao::new(&db));
        let schedules = Arc::new(ScheduleDao::new(&db));
        let applications = Arc::new(ApplicationDao::new(&db));
        let contracts = Arc::new(ContractDao::new(&db));
        let invitations = Arc::new(InvitationDao::new(
            &db,
            settings.invitations.default_ttl_hours,
        ));
        let analytics = Arc::new(AnalyticsDao::new(&db));

        Self {
            db,
            settings,
            auth,
            users,
            listings,
            orders,
            schedules,
            applications,
            contracts,
            invitations,
            analytics,
        }
    }
}
