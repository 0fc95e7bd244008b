pub mod user {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod friend {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod message {
    pub mod schema;
    pub mod model;
    pub mod celebration;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod story {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod streak {
    pub mod schema;
    pub mod state;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod anonymous {
    pub mod schema;
    pub mod model;
    pub mod pseudonym;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod quiz {
    pub mod schema;
    pub mod model;
    pub mod prompts;
    pub mod repository;
    pub mod repository_pg;
    pub mod service;
}

pub mod expiry {
    pub mod policy;
    pub mod reaper;
}

pub mod websocket {
    pub mod message;
    pub mod registry;
    pub mod presence;
    pub mod state;
    pub mod dispatch;
    pub mod session;
    pub mod handler;
}
