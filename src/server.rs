use std::sync::Arc;
use std::time::Duration;
use std::{fs, io};

use ntex::web;
use ntex::web::HttpRequest;
use ntex_files::NamedFile;
use serde::Serialize;
use spdlog::{info, warn};

use crate::config::Config;
use crate::content::Post;
use crate::engine::SyncEngine;
use crate::error::BlogError;
use crate::invalidation;
use crate::paginator::Paginator;
use crate::render_cache::{CacheEntry, RenderCache};
use crate::scanner::ContentScanner;
use crate::transform::{RelativeImagePrefix, TransformSet};
use crate::view::list_renderer::ListRenderer;
use crate::view::post_renderer::PostRenderer;
use crate::view::render_body;
use crate::view::rss_renderer::RssChannel;
use crate::watcher::FileWatcher;

const LIST_TEMPLATE: &str = "postlist.tpl";
const VIEW_TEMPLATE: &str = "view.tpl";

struct AppState {
    engine: Arc<SyncEngine>,
    cache: Arc<RenderCache>,
    transforms: TransformSet,
    config: Config,
}

fn cached(entry: &CacheEntry) -> web::HttpResponse {
    web::HttpResponse::Ok()
        .content_type(entry.mime_type.as_str())
        .body(entry.body.clone())
}

fn engine_error(err: BlogError) -> web::HttpResponse {
    match err {
        BlogError::NotFound => web::HttpResponse::NotFound().body("Not found"),
        other => web::HttpResponse::InternalServerError()
            .body(format!("Error loading content: {}", other)),
    }
}

fn get_cur_page(req: &HttpRequest) -> usize {
    let Some(query_str) = req.uri().query() else {
        return 1;
    };
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query_str).unwrap_or_else(|_| vec![]);
    pairs
        .into_iter()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

fn render_list(state: &AppState, posts: &[Arc<Post>], page_count: usize, cur_page: usize) -> io::Result<String> {
    let template_path = state.config.paths.template_dir.join(LIST_TEMPLATE);
    let template_src = fs::read_to_string(&template_path)?;
    let renderer = ListRenderer::new(&template_src, page_count)?;
    Ok(renderer.render(posts, cur_page))
}

fn render_view(state: &AppState, post: &Post) -> io::Result<String> {
    let content = render_body(post, &state.transforms)?;
    let template_path = state.config.paths.template_dir.join(VIEW_TEMPLATE);
    let template_src = fs::read_to_string(&template_path)?;
    let renderer = PostRenderer::new(&template_src)?;
    Ok(renderer.render(post, &content))
}

#[web::get("/")]
async fn index(req: HttpRequest, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let post_index = match state.engine.index().await {
        Ok(post_index) => post_index,
        Err(e) => return engine_error(e),
    };

    let page_size = state.config.defaults.page_size as usize;
    let paginator = Paginator::new(&post_index.chronological, page_size);
    let (cur_page, page_posts) = paginator.page_or_first(get_cur_page(&req));

    let key = format!("page/{}", cur_page);
    if let Some(entry) = state.cache.get(&key, Some(invalidation::PAGE_LISTING)) {
        return cached(&entry);
    }

    match render_list(&state, page_posts, paginator.page_count(), cur_page) {
        Ok(body) => {
            let entry = state.cache.put(&key, CacheEntry::html(body), Some(invalidation::PAGE_LISTING));
            cached(&entry)
        }
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error listing posts: {}", e)),
    }
}

#[web::get("/archive")]
async fn archive(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    if let Some(entry) = state.cache.get("archive", Some(invalidation::FULL_LISTING)) {
        return cached(&entry);
    }

    let posts = match state.engine.get_all().await {
        Ok(posts) => posts,
        Err(e) => return engine_error(e),
    };

    match render_list(&state, &posts, 1, 1) {
        Ok(body) => {
            let entry = state.cache.put("archive", CacheEntry::html(body), Some(invalidation::FULL_LISTING));
            cached(&entry)
        }
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error listing posts: {}", e)),
    }
}

#[web::get("/group/{group}")]
async fn group(path: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let group_name = path.into_inner();

    // The drafts listing lives in the default cache category; any other
    // group gets a category of its own, named after the group URL.
    let (key, category) = if group_name == "drafts" {
        (invalidation::DRAFTS_KEY.to_string(), None)
    } else {
        (format!("group/{}", group_name), Some(group_name.as_str()))
    };
    if let Some(entry) = state.cache.get(&key, category) {
        return cached(&entry);
    }

    let posts = match state.engine.get_by_group(&group_name).await {
        Ok(posts) => posts,
        Err(e) => return engine_error(e),
    };
    if posts.is_empty() {
        return web::HttpResponse::NotFound().body(format!("No such group: {}", group_name));
    }

    // A single-post group reads as a standalone page, several posts as a list.
    let rendered = if posts.len() == 1 {
        render_view(&state, &posts[0])
    } else {
        render_list(&state, &posts, 1, 1)
    };

    match rendered {
        Ok(body) => {
            let entry = state.cache.put(&key, CacheEntry::html(body), category);
            cached(&entry)
        }
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error rendering group {}: {}", group_name, e)),
    }
}

#[web::get("/{year}/{month}/{day}/{slug}")]
async fn view(path: web::types::Path<(i32, u32, u32, String)>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let (year, month, day, slug) = path.into_inner();

    let posts = match state.engine.get_by_slug_and_date(&slug, year, month, day).await {
        Ok(posts) => posts,
        Err(e) => return engine_error(e),
    };
    let Some(post) = posts.first() else {
        return web::HttpResponse::NotFound().body(format!("No such post: {}", slug));
    };

    let key = invalidation::post_key(post);
    if let Some(entry) = state.cache.get(&key, None) {
        return cached(&entry);
    }

    match render_view(&state, post) {
        Ok(body) => {
            let entry = state.cache.put(&key, CacheEntry::html(body), None);
            cached(&entry)
        }
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error loading post {}: {}", slug, e)),
    }
}

#[web::get("/rss.xml")]
async fn rss(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let Some(ref feed) = state.config.rss_feed else {
        return web::HttpResponse::NotFound().body("No feed configured");
    };

    // Feed content is order-sensitive the same way the archive is, so it
    // shares the full-listing cache category.
    if let Some(entry) = state.cache.get("rss", Some(invalidation::FULL_LISTING)) {
        return cached(&entry);
    }

    let mut posts = match state.engine.get_all().await {
        Ok(posts) => posts,
        Err(e) => return engine_error(e),
    };
    posts.truncate(feed.page_size as usize);

    let channel = RssChannel {
        ch_title: &feed.title,
        ch_link: &feed.site_url,
        ch_desc: &feed.description,
    };
    match channel.render(&posts) {
        Ok(xml) => {
            let body = String::from_utf8_lossy(&xml).into_owned();
            let entry = CacheEntry {
                body,
                mime_type: "application/rss+xml; charset=utf-8".to_string(),
            };
            let entry = state.cache.put("rss", entry, Some(invalidation::FULL_LISTING));
            cached(&entry)
        }
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error rendering feed: {}", e)),
    }
}

#[derive(Serialize)]
struct ApiPost<'a> {
    title: &'a str,
    slug: &'a str,
    date: Option<String>,
    group: Option<&'a str>,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

impl<'a> ApiPost<'a> {
    fn from(post: &'a Post, with_body: bool) -> ApiPost<'a> {
        ApiPost {
            title: &post.title,
            slug: &post.slug,
            date: post.date.map(|d| d.format("%Y-%m-%d").to_string()),
            group: post.group.as_deref(),
            url: &post.url,
            body: if with_body { Some(&post.body) } else { None },
        }
    }
}

fn json_posts(posts: &[Arc<Post>]) -> web::HttpResponse {
    let items: Vec<ApiPost> = posts.iter().map(|p| ApiPost::from(p, false)).collect();
    match serde_json::to_string(&items) {
        Ok(body) => web::HttpResponse::Ok()
            .content_type("application/json")
            .body(body),
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error serializing posts: {}", e)),
    }
}

#[web::get("/api/posts")]
async fn api_posts(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.engine.get_all().await {
        Ok(posts) => json_posts(&posts),
        Err(e) => engine_error(e),
    }
}

#[web::get("/api/page/{page}")]
async fn api_page(path: web::types::Path<usize>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let page_size = state.config.defaults.page_size as usize;
    match state.engine.get_by_page(path.into_inner(), page_size).await {
        Ok(posts) => json_posts(&posts),
        Err(e) => engine_error(e),
    }
}

#[web::get("/api/date/{year}/{month}/{day}")]
async fn api_date(path: web::types::Path<(i32, u32, u32)>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let (year, month, day) = path.into_inner();
    match state.engine.get_by_date(year, month, day).await {
        Ok(posts) => json_posts(&posts),
        Err(e) => engine_error(e),
    }
}

#[web::get("/api/group/{name}")]
async fn api_group(path: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.engine.get_by_group(&path.into_inner()).await {
        Ok(posts) => json_posts(&posts),
        Err(e) => engine_error(e),
    }
}

#[web::get("/api/post/{year}/{month}/{day}/{slug}")]
async fn api_post(path: web::types::Path<(i32, u32, u32, String)>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let (year, month, day, slug) = path.into_inner();
    let posts = match state.engine.get_by_slug_and_date(&slug, year, month, day).await {
        Ok(posts) => posts,
        Err(e) => return engine_error(e),
    };
    let Some(post) = posts.first() else {
        return web::HttpResponse::NotFound().body(format!("No such post: {}", slug));
    };

    match serde_json::to_string(&ApiPost::from(post, true)) {
        Ok(body) => web::HttpResponse::Ok()
            .content_type("application/json")
            .body(body),
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error serializing post: {}", e)),
    }
}

#[web::get("/public/{file_name}")]
async fn public_files(path: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> Result<NamedFile, web::Error> {
    if path.contains("../") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = state.config.paths.public_dir.join(path.into_inner());

    Ok(NamedFile::open(file_path)?)
}

pub async fn server_run(config: Config) -> io::Result<()> {
    let scanner = ContentScanner::new(config.paths.content.clone());
    let engine = Arc::new(SyncEngine::new(scanner));

    let cache = match config.paths.cache_dir {
        Some(ref dir) => Arc::new(RenderCache::with_disk(dir.clone())),
        None => Arc::new(RenderCache::new()),
    };

    {
        let cache = cache.clone();
        engine.subscribe(move |event| invalidation::apply(event, &cache));
    }

    match engine.index().await {
        Ok(post_index) => info!("loaded {} posts", post_index.all.len()),
        Err(e) => warn!("initial content load failed: {}", e),
    }

    let debounce = Duration::from_millis(config.defaults.debounce_ms.unwrap_or(250));
    match FileWatcher::new(engine.clone(), &config.paths.content, debounce) {
        Ok(watcher) => {
            ntex::rt::spawn(watcher.run());
        }
        Err(e) => warn!("file watching disabled: {}", e),
    }

    let mut transforms = TransformSet::new();
    transforms.add(RelativeImagePrefix::new("/public/"));

    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    let app_state = Arc::new(AppState {
        engine,
        cache,
        transforms,
        config,
    });

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .service(index)
            .service(archive)
            .service(rss)
            .service(public_files)
            .service(api_posts)
            .service(api_page)
            .service(api_date)
            .service(api_group)
            .service(api_post)
            .service(group)
            .service(view)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}
