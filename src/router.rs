/// Top-level pages. Unknown paths land on `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    ViewItems,
    AddItems,
    About,
    NotFound,
}

/// Navigation bar entries, in display order.
pub const NAV_ITEMS: [Route; 4] = [Route::Home, Route::ViewItems, Route::AddItems, Route::About];

impl Route {
    /// Resolves a location. Query string, fragment and a trailing slash are ignored.
    pub fn from_path(path: &str) -> Self {
        let path = path
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/view-items" => Route::ViewItems,
            "/add-items" => Route::AddItems,
            "/about" => Route::About,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> Option<&'static str> {
        match self {
            Route::Home => Some("/"),
            Route::ViewItems => Some("/view-items"),
            Route::AddItems => Some("/add-items"),
            Route::About => Some("/about"),
            Route::NotFound => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::ViewItems => "View Items",
            Route::AddItems => "Add Items",
            Route::About => "About",
            Route::NotFound => "Not Found",
        }
    }
}
