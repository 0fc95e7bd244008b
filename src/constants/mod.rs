pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub workers: usize,
    pub cleanup_interval_secs: u64,
    pub day_offset: chrono::FixedOffset,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");
        let workers = std::env::var("WORKERS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<usize>()
            .expect("WORKERS must be a valid usize integer");

        let cleanup_interval_secs = std::env::var("CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .expect("CLEANUP_INTERVAL_SECS must be a valid u64 integer");

        // Streak days are cut at local midnight of this offset.
        let day_offset_minutes = std::env::var("DAY_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<i32>()
            .expect("DAY_OFFSET_MINUTES must be a valid i32 integer");
        let day_offset = chrono::FixedOffset::east_opt(day_offset_minutes * 60)
            .expect("DAY_OFFSET_MINUTES must be within -1439..=1439");

        Env {
            jwt_secret,
            database_url,
            redis_url,
            frontend_url,
            ip,
            port,
            workers,
            cleanup_interval_secs,
            day_offset,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
