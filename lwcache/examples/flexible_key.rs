use lwcache::{Cache, NO_EXPIRE};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PageKey {
  title: &'static str,
  page: usize,
}

const PER_PAGE: usize = 10;

#[tokio::main]
async fn main() {
  let cache: Cache<PageKey, Vec<String>> = Cache::new("flexible-key");
  let titles = ["title1", "title2", "title3"];

  for title in titles {
    let items: Vec<String> = (0..100).map(|i| format!("{}-{}", title, i)).collect();
    for (page, chunk) in items.chunks(PER_PAGE).enumerate() {
      cache.set(PageKey { title, page }, chunk.to_vec(), NO_EXPIRE);
    }
  }

  for title in titles {
    for page in 0..PER_PAGE {
      let key = PageKey { title, page };
      let value = cache.get(&key);
      println!("key: {:?}, value: {:?}", key, value.as_deref());
    }
  }
}
