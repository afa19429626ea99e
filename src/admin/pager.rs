use std::collections::{HashSet, VecDeque};

use crate::error::AdminError;

use super::{AdminResult, InstanceAdmin, ListInstanceConfigOperationsRequest, Operation};

const DEFAULT_MAX_PAGES: usize = 1000;

/// Forward-only cursor over every page of a filtered operation listing.
pub struct OperationPager<'a> {
    admin: &'a dyn InstanceAdmin,
    request: ListInstanceConfigOperationsRequest,
    buffer: VecDeque<Operation>,
    seen_tokens: HashSet<String>,
    pages: usize,
    max_pages: usize,
    exhausted: bool,
}

impl<'a> OperationPager<'a> {
    pub fn new(
        admin: &'a dyn InstanceAdmin,
        request: ListInstanceConfigOperationsRequest,
    ) -> Self {
        Self {
            admin,
            request,
            buffer: VecDeque::new(),
            seen_tokens: HashSet::new(),
            pages: 0,
            max_pages: DEFAULT_MAX_PAGES,
            exhausted: false,
        }
    }

    #[cfg(test)]
    pub fn with_max_pages(
        mut self,
        max_pages: usize,
    ) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Next operation, or `None` once the last page has been drained.
    pub async fn next(&mut self) -> AdminResult<Option<Operation>> {
        loop {
            if let Some(operation) = self.buffer.pop_front() {
                return Ok(Some(operation));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> AdminResult<()> {
        if self.pages >= self.max_pages {
            return Err(AdminError::PaginationExceeded {
                parent: self.request.parent.clone(),
                max_pages: self.max_pages,
            });
        }

        let response = self
            .admin
            .list_instance_config_operations(&self.request)
            .await?;
        self.pages += 1;
        tracing::debug!(
            page = self.pages,
            operations = response.operations.len(),
            "fetched operation page"
        );
        self.buffer.extend(response.operations);

        let token = response.next_page_token;
        if token.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        if !self.seen_tokens.insert(token.clone()) {
            return Err(AdminError::PaginationStuck {
                parent: self.request.parent.clone(),
                token,
            });
        }
        self.request.page_token = Some(token);
        Ok(())
    }
}
