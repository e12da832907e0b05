//! Sequential, rate-limited walkers over remote collections.
//!
//! Two shapes exist in the services we talk to: a server-supplied "next" link
//! (Epicollect5, Panoptes) and a client-side running offset (ACTION database).
//! Both wait on a [`Throttle`] after every page they receive and abort on the
//! first failed request. Streams built from them are single-pass: once
//! exhausted or failed they only yield `None`.

use std::marker::PhantomData;

use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::error::HttpError;
use crate::http::{merge_query, ApiClient};
use crate::session::Throttle;

/// One decoded page of a cursor-paginated collection.
pub trait CursorPage: DeserializeOwned {
    type Item;

    /// Absolute or base-relative link to the following page, `None` on the last one.
    fn next_url(&self) -> Option<String>;

    fn page_number(&self) -> Option<u64> {
        None
    }

    fn into_items(self) -> Vec<Self::Item>;
}

/// One decoded page of an offset-paginated collection.
pub trait OffsetPage: DeserializeOwned {
    type Item;

    fn into_items(self) -> Vec<Self::Item>;
}

pub struct CursorPager<P> {
    client: ApiClient,
    next: Option<Url>,
    params: Vec<(String, String)>,
    throttle: Throttle,
    pages: usize,
    _page: PhantomData<fn() -> P>,
}

impl<P: CursorPage> CursorPager<P> {
    pub fn new(
        client: ApiClient,
        start: Url,
        params: Vec<(String, String)>,
        throttle: Throttle,
    ) -> Self {
        Self {
            client,
            next: Some(start),
            params,
            throttle,
            pages: 0,
            _page: PhantomData,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<P::Item>>, HttpError> {
        let Some(mut url) = self.next.take() else {
            return Ok(None);
        };
        merge_query(&mut url, &self.params);

        let page: P = self.client.get(url).await?;
        self.pages += 1;
        self.throttle.wait().await;

        self.next = match page.next_url() {
            Some(link) => Some(self.client.url(&link)?),
            None => None,
        };
        let number = page.page_number().unwrap_or(self.pages as u64);
        let items = page.into_items();
        tracing::debug!(page = number, items = items.len(), "page received");
        Ok(Some(items))
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<P::Item, HttpError>> {
        stream::try_unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Ok::<_, HttpError>(page.map(|items| (item_stream(items), pager)))
        })
        .try_flatten()
        .fuse()
    }
}

/// Window of an offset-paginated walk: `limit` items, `page_size` at a time.
#[derive(Debug, Clone, Copy)]
pub struct OffsetWindow {
    pub page_size: usize,
    pub limit: usize,
    /// Query parameter carrying the running offset.
    pub offset_param: &'static str,
    /// Query parameter carrying the size of the requested page.
    pub size_param: &'static str,
}

pub struct OffsetPager<P> {
    client: ApiClient,
    url: Url,
    params: Vec<(String, String)>,
    window: OffsetWindow,
    offset: usize,
    throttle: Throttle,
    pages: usize,
    _page: PhantomData<fn() -> P>,
}

impl<P: OffsetPage> OffsetPager<P> {
    pub fn new(
        client: ApiClient,
        url: Url,
        params: Vec<(String, String)>,
        window: OffsetWindow,
        throttle: Throttle,
    ) -> Self {
        Self {
            client,
            url,
            params,
            window,
            offset: 0,
            throttle,
            pages: 0,
            _page: PhantomData,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<P::Item>>, HttpError> {
        if self.offset >= self.window.limit || self.window.page_size == 0 {
            return Ok(None);
        }
        // The last page only asks for what is left under the limit.
        let size = self.window.page_size.min(self.window.limit - self.offset);
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
            query.append_pair(self.window.size_param, &size.to_string());
            query.append_pair(self.window.offset_param, &self.offset.to_string());
        }

        let page: P = self.client.get(url).await?;
        self.pages += 1;
        self.throttle.wait().await;

        // Servers that ignore the size parameter must not push us past the limit.
        let mut items = page.into_items();
        items.truncate(size);
        tracing::debug!(offset = self.offset, items = items.len(), "page received");
        self.offset += self.window.page_size;
        Ok(Some(items))
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<P::Item, HttpError>> {
        stream::try_unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Ok::<_, HttpError>(page.map(|items| (item_stream(items), pager)))
        })
        .try_flatten()
        .fuse()
    }
}

fn item_stream<T>(items: Vec<T>) -> impl Stream<Item = Result<T, HttpError>> {
    stream::iter(items.into_iter().map(Ok))
}
