use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::{
    ai::{OpenRouterClient, ProposalResolver},
    config::AppConfig,
    infrastructure::{
        directories::ResolvedPaths, instance_guard::InstanceGuard, shutdown::Shutdown,
    },
    marketplace::{FreelancerDriver, MarketplaceDriver},
    store::BidStateStore,
    tasks::{BidProcessor, IntakeFilter, PollPolicy, SessionLoop},
};

pub struct BidPilotApp {
    _guard: InstanceGuard,
    session: SessionLoop,
    shutdown: Shutdown,
}

impl BidPilotApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        guard: InstanceGuard,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let store = Arc::new(BidStateStore::open(&paths)?);

        let http = Client::builder()
            .user_agent(format!("bidpilot/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let generator = Arc::new(OpenRouterClient::new(
            http.clone(),
            config.openrouter.clone(),
        ));
        let resolver = ProposalResolver::new(generator);

        let driver: Arc<dyn MarketplaceDriver> = Arc::new(
            FreelancerDriver::connect(http, config.webdriver.clone(), config.credentials.clone())
                .await
                .context("could not reach the webdriver endpoint")?,
        );
        // A session that cannot log in can never submit; fail here instead
        // of looping on a logged-out browser.
        driver.login().await.context("marketplace login failed")?;

        let filter = IntakeFilter::new(&config.intake, store.clone());
        let processor = BidProcessor::new(driver.clone(), resolver, store.clone());
        let session = SessionLoop::new(
            driver,
            filter,
            processor,
            store,
            PollPolicy::new(&config.poll),
        );

        Ok(Self {
            _guard: guard,
            session,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("bidpilot started");
        let listener = self.shutdown.subscribe();
        let result = self.session.run(listener).await;
        tracing::info!("bidpilot stopped");
        result
    }
}
