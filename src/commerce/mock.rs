use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    BackendFile, CommerceBackend, CommerceError, FileLink, FilePurpose, FileUpload, Product,
    Result,
};

#[derive(Default)]
struct MockState {
    products: Vec<Product>,
    files: HashMap<String, FileUpload>,
    list_count: usize,
    upload_count: usize,
    link_count: usize,
    update_count: usize,
}

/// In-memory commerce backend
#[derive(Clone)]
pub struct MockCommerceBackend {
    state: Arc<Mutex<MockState>>,
    link_base_url: String,
    links_without_url: bool,
}

impl MockCommerceBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            link_base_url: "https://files.mock-commerce.example.com/links".to_string(),
            links_without_url: false,
        }
    }

    pub fn with_link_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.link_base_url = base_url.into();
        self
    }

    /// File links come back without a URL
    pub fn with_links_without_url(mut self) -> Self {
        self.links_without_url = true;
        self
    }

    pub fn with_product(self, product: Product) -> Self {
        self.state.lock().products.push(product);
        self
    }

    /// Add `count` filler products ahead of any added later
    pub fn with_filler_products(self, count: usize) -> Self {
        {
            let mut state = self.state.lock();
            for i in 0..count {
                state.products.push(
                    Product::new(format!("prod_filler_{}", i), format!("Filler {}", i))
                        .with_slug(format!("filler-{}", i)),
                );
            }
        }
        self
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.state.lock().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn get_list_count(&self) -> usize {
        self.state.lock().list_count
    }

    pub fn get_upload_count(&self) -> usize {
        self.state.lock().upload_count
    }

    pub fn get_link_count(&self) -> usize {
        self.state.lock().link_count
    }

    pub fn get_update_count(&self) -> usize {
        self.state.lock().update_count
    }

    pub fn get_files(&self) -> HashMap<String, FileUpload> {
        self.state.lock().files.clone()
    }
}

impl Default for MockCommerceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommerceBackend for MockCommerceBackend {
    async fn list_products(&self, limit: usize) -> Result<Vec<Product>> {
        let mut state = self.state.lock();
        state.list_count += 1;
        Ok(state.products.iter().take(limit).cloned().collect())
    }

    async fn upload_file(&self, purpose: FilePurpose, upload: FileUpload) -> Result<BackendFile> {
        let mut state = self.state.lock();
        state.upload_count += 1;

        let id = format!("file_{}", uuid::Uuid::new_v4().simple());
        let size = upload.data.len() as u64;
        state.files.insert(id.clone(), upload);

        Ok(BackendFile {
            id,
            size,
            purpose: Some(purpose.as_str().to_string()),
        })
    }

    async fn create_file_link(&self, file_id: &str) -> Result<FileLink> {
        let mut state = self.state.lock();
        if !state.files.contains_key(file_id) {
            return Err(CommerceError::UnknownFile(file_id.to_string()));
        }
        state.link_count += 1;

        let id = format!("link_{}", uuid::Uuid::new_v4().simple());
        let url = if self.links_without_url {
            None
        } else {
            Some(format!("{}/{}", self.link_base_url, id))
        };
        Ok(FileLink { id, url })
    }

    async fn update_product_images(
        &self,
        product_id: &str,
        images: Vec<String>,
    ) -> Result<Product> {
        let mut state = self.state.lock();
        state.update_count += 1;

        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| CommerceError::UnknownProduct(product_id.to_string()))?;
        product.images = images;
        Ok(product.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> FileUpload {
        FileUpload {
            name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            data: bytes::Bytes::from_static(b"\x89PNG"),
        }
    }

    #[tokio::test]
    async fn test_scan_window() {
        let backend = MockCommerceBackend::new()
            .with_filler_products(100)
            .with_product(Product::new("prod_late", "Late").with_slug("late"));

        assert!(backend.find_product_by_slug("filler-99").await.unwrap().is_some());
        // 101st product is outside the scan window
        assert!(backend.find_product_by_slug("late").await.unwrap().is_none());
        assert_eq!(backend.get_list_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_link_update() {
        let backend = MockCommerceBackend::new()
            .with_product(Product::new("prod_1", "Hat").with_slug("hat"));

        let file = backend
            .upload_file(FilePurpose::BusinessLogo, upload())
            .await
            .unwrap();
        assert_eq!(file.size, 4);

        let link = backend.create_file_link(&file.id).await.unwrap();
        let url = link.url.unwrap();
        assert!(url.starts_with("https://files.mock-commerce.example.com/links/"));

        let product = backend
            .update_product_images("prod_1", vec![url.clone()])
            .await
            .unwrap();
        assert_eq!(product.images, vec![url]);
        assert_eq!(backend.get_upload_count(), 1);
        assert_eq!(backend.get_update_count(), 1);
    }

    #[tokio::test]
    async fn test_link_for_unknown_file() {
        let backend = MockCommerceBackend::new();
        let result = backend.create_file_link("file_nope").await;
        assert!(matches!(result, Err(CommerceError::UnknownFile(_))));
    }

    #[tokio::test]
    async fn test_links_without_url() {
        let backend = MockCommerceBackend::new().with_links_without_url();
        let file = backend
            .upload_file(FilePurpose::BusinessLogo, upload())
            .await
            .unwrap();
        assert!(backend.create_file_link(&file.id).await.unwrap().url.is_none());
    }
}
