//! Built-in service templates, one per supported technology.
//!
//! A template is declarative data only; the composer owns all merge and
//! conflict logic. The registry is plain data injected into the composer,
//! so tests can swap in a reduced set.

use crate::stack::{TechKind, TechnologyId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Copy changed files into the running container.
    Sync,
    /// Rebuild the image when the file changes.
    Rebuild,
}

/// One file-watch rule for `develop.watch`.
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub path: String,
    pub action: WatchAction,
    /// Container path for sync rules; rebuild rules have none.
    pub target: Option<String>,
}

impl WatchRule {
    fn sync(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            action: WatchAction::Sync,
            target: Some(target.to_string()),
        }
    }

    fn rebuild(path: &str) -> Self {
        Self {
            path: path.to_string(),
            action: WatchAction::Rebuild,
            target: None,
        }
    }
}

/// Declarative description of the service a technology contributes.
#[derive(Debug, Clone)]
pub struct ServiceTemplate {
    /// Preferred service name ("web", "db", "redis").
    pub service_name: String,
    /// Image repository; the resolved tag is appended ("python" -> "python:3.12-slim").
    pub image_repo: String,
    pub working_dir: Option<String>,
    pub command: Option<String>,
    /// (host, container) pairs.
    pub ports: Vec<(u16, u16)>,
    /// Relative-host-path to container-path bind mounts.
    pub bind_mounts: Vec<(String, String)>,
    /// Named volume to container-path mounts; names land in the top-level
    /// `volumes:` section.
    pub named_volumes: Vec<(String, String)>,
    pub environment: Vec<(String, String)>,
    pub restart: Option<String>,
    pub watch: Vec<WatchRule>,
    /// Defaults applied under `--resource-limits`.
    pub cpu_limit: String,
    pub memory_limit: String,
    /// May receive an nvidia device reservation when GPU output is on.
    pub gpu_eligible: bool,
    /// Application services get a build context and a bake target; databases
    /// and proxies run stock images.
    pub buildable: bool,
}

/// Builder for the common application-service shape.
struct App {
    template: ServiceTemplate,
}

impl App {
    fn new(service_name: &str, image_repo: &str) -> Self {
        Self {
            template: ServiceTemplate {
                service_name: service_name.to_string(),
                image_repo: image_repo.to_string(),
                working_dir: Some("/app".to_string()),
                command: None,
                ports: Vec::new(),
                bind_mounts: vec![(".".to_string(), "/app".to_string())],
                named_volumes: Vec::new(),
                environment: Vec::new(),
                restart: None,
                watch: vec![WatchRule::sync(".", "/app")],
                cpu_limit: "2.0".to_string(),
                memory_limit: "2G".to_string(),
                gpu_eligible: true,
                buildable: true,
            },
        }
    }

    fn command(mut self, command: &str) -> Self {
        self.template.command = Some(command.to_string());
        self
    }

    fn port(mut self, host: u16, container: u16) -> Self {
        self.template.ports.push((host, container));
        self
    }

    fn env(mut self, key: &str, value: &str) -> Self {
        self.template
            .environment
            .push((key.to_string(), value.to_string()));
        self
    }

    fn cache_volume(mut self, name: &str, path: &str) -> Self {
        self.template
            .named_volumes
            .push((name.to_string(), path.to_string()));
        self
    }

    fn rebuild_on(mut self, manifest: &str) -> Self {
        self.template.watch.push(WatchRule::rebuild(manifest));
        self
    }

    fn build(self) -> ServiceTemplate {
        self.template
    }
}

/// Builder for stock-image services (databases, proxies).
struct Stock {
    template: ServiceTemplate,
}

impl Stock {
    fn new(service_name: &str, image_repo: &str) -> Self {
        Self {
            template: ServiceTemplate {
                service_name: service_name.to_string(),
                image_repo: image_repo.to_string(),
                working_dir: None,
                command: None,
                ports: Vec::new(),
                bind_mounts: Vec::new(),
                named_volumes: Vec::new(),
                environment: Vec::new(),
                restart: Some("unless-stopped".to_string()),
                watch: Vec::new(),
                cpu_limit: "1.0".to_string(),
                memory_limit: "1G".to_string(),
                gpu_eligible: false,
                buildable: false,
            },
        }
    }

    fn port(mut self, host: u16, container: u16) -> Self {
        self.template.ports.push((host, container));
        self
    }

    fn env(mut self, key: &str, value: &str) -> Self {
        self.template
            .environment
            .push((key.to_string(), value.to_string()));
        self
    }

    fn data_volume(mut self, name: &str, path: &str) -> Self {
        self.template
            .named_volumes
            .push((name.to_string(), path.to_string()));
        self
    }

    fn memory(mut self, limit: &str) -> Self {
        self.template.memory_limit = limit.to_string();
        self
    }

    fn build(self) -> ServiceTemplate {
        self.template
    }
}

pub struct TemplateRegistry {
    templates: HashMap<TechnologyId, ServiceTemplate>,
}

impl TemplateRegistry {
    pub fn with_defaults() -> Self {
        use TechnologyId::*;
        let mut templates = HashMap::new();
        let mut add = |id: TechnologyId, t: ServiceTemplate| {
            templates.insert(id, t);
        };

        // Languages.
        add(
            Node,
            App::new("app", "node")
                .command("npm start")
                .port(3000, 3000)
                .env("NODE_ENV", "development")
                .cache_volume("node-modules", "/app/node_modules")
                .rebuild_on("package.json")
                .build(),
        );
        add(
            Python,
            App::new("app", "python")
                .command("python main.py")
                .port(8000, 8000)
                .env("PYTHONUNBUFFERED", "1")
                .cache_volume("pip-cache", "/root/.cache/pip")
                .rebuild_on("requirements.txt")
                .build(),
        );
        add(
            Php,
            App::new("web", "php").port(8080, 80).build(),
        );
        add(
            Go,
            App::new("app", "golang")
                .command("go run .")
                .port(8080, 8080)
                .cache_volume("go-modules", "/go/pkg/mod")
                .rebuild_on("go.mod")
                .build(),
        );
        add(
            Cpp,
            App::new("app", "gcc")
                .command("sh -c 'make && ./app'")
                .build(),
        );
        add(
            Ruby,
            App::new("app", "ruby")
                .command("bundle exec ruby app.rb")
                .port(3000, 3000)
                .cache_volume("bundle-cache", "/usr/local/bundle")
                .rebuild_on("Gemfile")
                .build(),
        );
        add(
            DotNet,
            App::new("app", "mcr.microsoft.com/dotnet/sdk")
                .command("dotnet watch run --urls http://0.0.0.0:8080")
                .port(5000, 8080)
                .env("DOTNET_USE_POLLING_FILE_WATCHER", "true")
                .build(),
        );
        add(
            Rust,
            App::new("app", "rust")
                .command("cargo run")
                .port(8080, 8080)
                .cache_volume("cargo-registry", "/usr/local/cargo/registry")
                .rebuild_on("Cargo.toml")
                .build(),
        );
        add(
            Scala,
            App::new("app", "sbtscala/scala-sbt")
                .command("sbt run")
                .cache_volume("ivy-cache", "/root/.ivy2")
                .build(),
        );
        add(
            Elixir,
            App::new("app", "elixir")
                .command("mix phx.server")
                .port(4000, 4000)
                .cache_volume("mix-deps", "/app/deps")
                .rebuild_on("mix.exs")
                .build(),
        );

        // Frameworks.
        add(
            Spring,
            App::new("app", "eclipse-temurin")
                .command("./mvnw spring-boot:run")
                .port(8080, 8080)
                .cache_volume("maven-cache", "/root/.m2")
                .rebuild_on("pom.xml")
                .build(),
        );
        add(
            Django,
            App::new("web", "python")
                .command("python manage.py runserver 0.0.0.0:8000")
                .port(8000, 8000)
                .env("PYTHONUNBUFFERED", "1")
                .cache_volume("pip-cache", "/root/.cache/pip")
                .rebuild_on("requirements.txt")
                .build(),
        );
        add(
            Flask,
            App::new("web", "python")
                .command("flask run --host=0.0.0.0")
                .port(5000, 5000)
                .env("FLASK_APP", "app.py")
                .env("FLASK_ENV", "development")
                .env("PYTHONUNBUFFERED", "1")
                .cache_volume("pip-cache", "/root/.cache/pip")
                .rebuild_on("requirements.txt")
                .build(),
        );
        add(
            FastApi,
            App::new("api", "python")
                .command("uvicorn main:app --host 0.0.0.0 --port 8000 --reload")
                .port(8000, 8000)
                .env("PYTHONUNBUFFERED", "1")
                .cache_volume("pip-cache", "/root/.cache/pip")
                .rebuild_on("requirements.txt")
                .build(),
        );
        add(
            Laravel,
            App::new("app", "php")
                .command("php artisan serve --host=0.0.0.0")
                .port(8000, 8000)
                .cache_volume("composer-cache", "/root/.composer/cache")
                .rebuild_on("composer.json")
                .build(),
        );
        add(
            React,
            App::new("frontend", "node")
                .command("npm start")
                .port(3000, 3000)
                .env("CHOKIDAR_USEPOLLING", "true")
                .cache_volume("node-modules", "/app/node_modules")
                .rebuild_on("package.json")
                .build(),
        );
        add(
            Vue,
            App::new("frontend", "node")
                .command("npm run serve")
                .port(8080, 8080)
                .cache_volume("node-modules", "/app/node_modules")
                .rebuild_on("package.json")
                .build(),
        );
        add(
            Angular,
            App::new("frontend", "node")
                .command("npm start -- --host 0.0.0.0")
                .port(4200, 4200)
                .cache_volume("node-modules", "/app/node_modules")
                .rebuild_on("package.json")
                .build(),
        );

        // Databases.
        add(
            Postgres,
            Stock::new("db", "postgres")
                .port(5432, 5432)
                .env("POSTGRES_USER", "postgres")
                .env("POSTGRES_PASSWORD", "postgres")
                .env("POSTGRES_DB", "app")
                .data_volume("pgdata", "/var/lib/postgresql/data")
                .build(),
        );
        add(
            Mysql,
            Stock::new("db", "mysql")
                .port(3306, 3306)
                .env("MYSQL_ROOT_PASSWORD", "root")
                .env("MYSQL_DATABASE", "app")
                .data_volume("mysqldata", "/var/lib/mysql")
                .build(),
        );
        add(
            MariaDb,
            Stock::new("db", "mariadb")
                .port(3306, 3306)
                .env("MARIADB_ROOT_PASSWORD", "root")
                .env("MARIADB_DATABASE", "app")
                .data_volume("mariadbdata", "/var/lib/mysql")
                .build(),
        );
        add(
            MongoDb,
            Stock::new("mongodb", "mongo")
                .port(27017, 27017)
                .env("MONGO_INITDB_ROOT_USERNAME", "root")
                .env("MONGO_INITDB_ROOT_PASSWORD", "example")
                .data_volume("mongodata", "/data/db")
                .build(),
        );
        add(
            Redis,
            Stock::new("redis", "redis")
                .port(6379, 6379)
                .data_volume("redisdata", "/data")
                .memory("512M")
                .build(),
        );
        add(
            Elasticsearch,
            Stock::new("elasticsearch", "docker.elastic.co/elasticsearch/elasticsearch")
                .port(9200, 9200)
                .env("discovery.type", "single-node")
                .env("xpack.security.enabled", "false")
                .data_volume("esdata", "/usr/share/elasticsearch/data")
                .memory("2G")
                .build(),
        );
        add(
            Cassandra,
            Stock::new("db", "cassandra")
                .port(9042, 9042)
                .env("CASSANDRA_CLUSTER_NAME", "local")
                .data_volume("cassandradata", "/var/lib/cassandra")
                .memory("2G")
                .build(),
        );

        // Tools.
        add(
            Jupyter,
            Stock::new("notebook", "jupyter/base-notebook")
                .port(8888, 8888)
                .build(),
        );
        add(
            Nginx,
            Stock::new("proxy", "nginx")
                .port(80, 80)
                .port(443, 443)
                .memory("256M")
                .build(),
        );
        add(
            Apache,
            Stock::new("proxy", "httpd")
                .port(80, 80)
                .memory("256M")
                .build(),
        );

        Self { templates }
    }

    pub fn get(&self, id: &TechnologyId) -> Option<&ServiceTemplate> {
        self.templates.get(id)
    }

    /// Supported technologies grouped by kind, names sorted, for `list`.
    pub fn list_supported(&self) -> Vec<(TechKind, Vec<String>)> {
        let mut groups: Vec<(TechKind, Vec<String>)> = [
            TechKind::Language,
            TechKind::Framework,
            TechKind::Database,
            TechKind::Tool,
        ]
        .into_iter()
        .map(|kind| (kind, Vec::new()))
        .collect();

        for id in self.templates.keys() {
            if let Some((_, names)) = groups.iter_mut().find(|(kind, _)| *kind == id.kind()) {
                names.push(id.name().to_string());
            }
        }
        for (_, names) in &mut groups {
            names.sort();
        }
        groups
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
